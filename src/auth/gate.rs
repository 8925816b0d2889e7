use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::{extractors::session_user, jwt::SessionKeys};
use crate::state::AppState;

pub const RESTRICTED_PATH: &str = "/restricted";
const PROTECTED_PREFIXES: [&str; 2] = ["/car", "/account"];

/// `/car`, `/car/...`, `/account` and `/account/...` need a session.
pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .map(|rest| rest.is_empty() || rest.starts_with('/'))
            .unwrap_or(false)
    })
}

/// Sends anonymous requests for protected paths to the restricted page.
pub async fn require_session(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if is_protected(path) {
        let keys = SessionKeys::from_ref(&state);
        if session_user(req.headers(), &keys).is_none() {
            debug!(path, "anonymous request to protected path");
            return Redirect::temporary(RESTRICTED_PATH).into_response();
        }
    }
    next.run(req).await
}
