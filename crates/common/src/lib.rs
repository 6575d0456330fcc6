//! Shared types for the storefront core.
//!
//! Identifiers, the caller identity handed in by the authentication layer,
//! and the clock abstraction used for timestamps and coupon windows.

pub mod clock;
pub mod identity;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use identity::{Identity, Role};
pub use types::{OrderId, UserId};
