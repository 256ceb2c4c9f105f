//! Token authentication: the in-process token store and the header
//! credential parsing shared by the middleware and the logout handler.

pub mod token_store;

pub use token_store::{InMemoryTokenStore, TokenStore};

use axum::http::HeaderMap;
use thiserror::Error;

/// Authentication failure reasons, surfaced verbatim as 401 details.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,

    #[error("Invalid token header. No credentials provided.")]
    EmptyToken,

    #[error("Invalid token header.")]
    MalformedHeader,

    #[error("Invalid token.")]
    UnknownToken,

    #[error("User not found for token.")]
    UnknownUser,
}

/// Scheme prefix consumed from the Authorization header.
const KEYWORD: &str = "token";

/// Extract the bearer token from an `Authorization: Token <value>` header.
///
/// A missing header or a different scheme both mean "no credentials": the
/// request falls through to the permission gate rather than failing with a
/// malformed-header error.
pub fn parse_token_header(headers: &HeaderMap) -> Result<String, AuthError> {
    let Some(raw) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return Err(AuthError::MissingCredentials);
    };

    let mut parts = raw.split_whitespace();

    match parts.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case(KEYWORD) => {}
        _ => return Err(AuthError::MissingCredentials),
    }

    let Some(token) = parts.next() else {
        return Err(AuthError::EmptyToken);
    };

    if parts.next().is_some() {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token.to_string())
}
