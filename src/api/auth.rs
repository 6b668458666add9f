//! Session-token extraction for the REST API
//!
//! Clients send the token returned by `POST /api/login` in the
//! `X-Session-Token` header. Extraction never rejects a request: whether a
//! missing or unknown token is an error depends on the endpoint. Job
//! submissions accept it and fail the job's items; catalog lookups fall back to
//! anonymous access when the header is absent.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

/// Header carrying the session token
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Optional session token from the `X-Session-Token` header
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionToken(pub Option<String>);

impl SessionToken {
    /// The token, if present and non-empty
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Take the token out
    pub fn into_inner(self) -> Option<String> {
        self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(SESSION_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(String::from);
        Ok(SessionToken(token))
    }
}
