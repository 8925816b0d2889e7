use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use super::repo;
use crate::{
    auth::{dto::PublicUser, extractors::AuthUser, repo_types::User},
    cars::services::find_car,
    error::AppError,
    registry::Car,
    state::AppState,
};

pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/car/:plate/favorite", post(add_favorite).delete(remove_favorite))
        .route("/account", get(account))
}

#[derive(Debug, Serialize)]
pub struct FavoriteResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

type FavoriteResponse = Result<Json<FavoriteResult>, (StatusCode, Json<FavoriteResult>)>;

fn failed(status: StatusCode, msg: &str) -> (StatusCode, Json<FavoriteResult>) {
    (
        status,
        Json(FavoriteResult {
            success: false,
            favorite: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn done(favorite: bool) -> Json<FavoriteResult> {
    Json(FavoriteResult {
        success: true,
        favorite: Some(favorite),
        error: None,
    })
}

/// POST /car/:plate/favorite
#[instrument(skip(state))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(plate): Path<String>,
) -> FavoriteResponse {
    let plate = plate.trim();
    if plate.is_empty() {
        return Err(failed(StatusCode::BAD_REQUEST, "Plate is required"));
    }
    repo::add(&state.db, user_id, plate).await.map_err(|e| {
        error!(error = %e, user_id, plate, "add favorite failed");
        failed(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
    })?;
    info!(user_id, plate, "favorite added");
    Ok(done(true))
}

/// DELETE /car/:plate/favorite
#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(plate): Path<String>,
) -> FavoriteResponse {
    let plate = plate.trim();
    repo::remove(&state.db, user_id, plate).await.map_err(|e| {
        error!(error = %e, user_id, plate, "remove favorite failed");
        failed(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
    })?;
    info!(user_id, plate, "favorite removed");
    Ok(done(false))
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub user: PublicUser,
    pub favorites: Vec<Car>,
}

/// GET /account: profile plus favorite cars. Plates that no longer resolve
/// to a car are left out.
#[instrument(skip(state))]
pub async fn account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<AccountView>, AppError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    let plates = repo::list_plates(&state.db, user_id)
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, user_id, "fetch favorites failed");
            Vec::new()
        });

    let lookups = join_all(plates.iter().map(|plate| find_car(&state, plate))).await;
    let mut favorites = Vec::with_capacity(plates.len());
    for (plate, found) in plates.iter().zip(lookups) {
        match found {
            Ok(Some(car)) => favorites.push(car),
            Ok(None) => warn!(user_id, plate = %plate, "favorite does not resolve to a car"),
            Err(e) => error!(error = %e, plate = %plate, "favorite lookup failed"),
        }
    }

    Ok(Json(AccountView {
        user: user.into(),
        favorites,
    }))
}
