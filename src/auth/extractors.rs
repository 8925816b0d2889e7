use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use super::jwt::SessionKeys;
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "session";

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::to_string)
}

/// Session tokens the request carries: the `session` cookie first, then
/// `Authorization: Bearer`.
pub fn session_tokens(headers: &HeaderMap) -> Vec<String> {
    cookie_token(headers)
        .into_iter()
        .chain(bearer_token(headers))
        .collect()
}

/// User id of the first token that verifies, if any.
pub fn session_user(headers: &HeaderMap, keys: &SessionKeys) -> Option<i64> {
    for token in session_tokens(headers) {
        match keys.verify(&token) {
            Ok(claims) => return Some(claims.sub),
            Err(e) => warn!(error = %e, "invalid or expired session"),
        }
    }
    None
}

/// Signed-in user id; rejects with 401 otherwise.
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        session_user(&parts.headers, &keys)
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized("You must be signed in.".into()))
    }
}

/// Signed-in user id, if any. Never rejects.
pub struct MaybeUser(pub Option<i64>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        Ok(MaybeUser(session_user(&parts.headers, &keys)))
    }
}
