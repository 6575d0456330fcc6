pub mod admin;
pub mod coupons;
pub mod orders;
pub mod system;
