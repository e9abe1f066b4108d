//! Caller identity taken from the `X-User-Id` request header.
//!
//! Authentication itself happens upstream; this service only trusts the
//! forwarded user id.

use crate::error::ApiError;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// The signed-in user. Use `Option<CurrentUser>` for endpoints that also
/// serve anonymous callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0
    }

    fn from_headers(req: &HttpRequest) -> Result<Self, ApiError> {
        let value = req
            .headers()
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::AuthenticationError("Sign in required".to_string()))?;

        value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .map(CurrentUser)
            .ok_or_else(|| ApiError::AuthenticationError("Malformed user id".to_string()))
    }
}

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_headers(req))
    }
}
