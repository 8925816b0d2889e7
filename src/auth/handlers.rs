use axum::{
    extract::{FromRef, Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{CallbackQuery, Link, PageMessage, PublicUser},
        extractors::{AuthUser, MaybeUser, SESSION_COOKIE},
        gate::RESTRICTED_PATH,
        jwt::SessionKeys,
        repo_types::User,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/github/login", get(github_login))
        .route("/auth/github/callback", get(github_callback))
        .route("/auth/signout", post(sign_out))
}

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route(RESTRICTED_PATH, get(restricted))
        .route("/me", get(get_me))
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let cfg = &state.config.session;
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cfg.cookie_secure)
        .max_age(time::Duration::minutes(cfg.ttl_minutes))
        .build()
}

#[instrument(skip(state))]
pub async fn github_login(State(state): State<AppState>) -> Result<Redirect, AppError> {
    let url = state.github.authorize_url(&state.db).await?;
    Ok(Redirect::to(&url))
}

#[instrument(skip(state, jar, query))]
pub async fn github_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<(CookieJar, Redirect), AppError> {
    if let Some(err) = query.error {
        warn!(error = %err, "github sign-in declined");
        return Ok((jar, Redirect::to(RESTRICTED_PATH)));
    }
    let (Some(code), Some(csrf_state)) = (query.code, query.state) else {
        return Err(AppError::BadRequest("code and state are required".into()));
    };

    let user = state
        .github
        .complete(&state.db, &code, &csrf_state)
        .await
        .map_err(|e| {
            warn!(error = %e, "github sign-in failed");
            AppError::Unauthorized("Sign-in failed".into())
        })?;

    let token = SessionKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = user.id, "signed in");
    Ok((jar.add(session_cookie(&state, token)), Redirect::to("/car")))
}

#[instrument(skip(jar))]
pub async fn sign_out(jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/"))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| {
            error!(user_id, "session for unknown user");
            AppError::Unauthorized("User not found".into())
        })?;
    Ok(Json(user.into()))
}

pub async fn home(MaybeUser(user): MaybeUser) -> Json<PageMessage> {
    Json(PageMessage {
        title: "Welcome",
        message: "Sign in with GitHub to access the car list.",
        signed_in: user.is_some(),
        links: vec![
            Link { label: "Sign in with GitHub", href: "/auth/github/login" },
            Link { label: "Go to List", href: "/car" },
        ],
    })
}

pub async fn restricted(MaybeUser(user): MaybeUser) -> Json<PageMessage> {
    Json(PageMessage {
        title: "Access Restricted",
        message: "You must sign in with GitHub to view this page.",
        signed_in: user.is_some(),
        links: vec![
            Link { label: "Sign in with GitHub", href: "/auth/github/login" },
            Link { label: "Back to Home", href: "/" },
        ],
    })
}
