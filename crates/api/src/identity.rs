//! Caller identity extractor.
//!
//! Session handling lives in front of this service; it forwards the
//! authenticated user as `x-user-id` and `x-user-role` headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{Identity, Role, UserId};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The identity of whoever made the request.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Identity);

impl Caller {
    /// Rejects callers without the admin role.
    pub fn require_admin(&self) -> Result<Identity, ApiError> {
        if self.0.is_admin() {
            Ok(self.0)
        } else {
            Err(ApiError::Forbidden("admin role required".to_string()))
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
        };

        let user_id: UserId = header(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?
            .parse()
            .map_err(|e| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER}: {e}")))?;

        let role = match header(USER_ROLE_HEADER) {
            Some(role) => role.parse::<Role>().map_err(ApiError::BadRequest)?,
            None => Role::Customer,
        };

        Ok(Caller(Identity { user_id, role }))
    }
}
