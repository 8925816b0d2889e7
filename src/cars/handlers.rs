use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};

use super::dto::{AddCarRequest, CarDetails, CarListResponse, GeneratedPlate, ListQuery, ListedCar};
use super::{repo, services};
use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    favorites,
    registry::{page_offset, Car, PAGE_SIZE},
    state::AppState,
};

pub fn car_routes() -> Router<AppState> {
    Router::new()
        .route("/car", get(list_cars))
        .route("/car/add", post(add_car))
        .route("/car/add/plate", get(generate_plate))
        .route("/car/:plate", get(get_car))
}

/// GET /car?search=&page=
#[instrument(skip(state))]
pub async fn list_cars(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<CarListResponse>, AppError> {
    let page = q.page();
    let search = q.search.trim().to_string();

    let (registry_cars, user_cars, favorite_plates) = tokio::join!(
        state.registry.search_cars(&search, PAGE_SIZE, page_offset(page)),
        repo::list_by_user(&state.db, user_id),
        favorites::repo::list_plates(&state.db, user_id),
    );

    let registry_cars = registry_cars.map_err(|e| AppError::Upstream(e.to_string()))?;
    let user_cars = user_cars.unwrap_or_else(|e| {
        error!(error = %e, user_id, "fetch user cars failed");
        Vec::new()
    });
    let favorite_plates: HashSet<String> = favorite_plates
        .unwrap_or_else(|e| {
            error!(error = %e, user_id, "fetch favorites failed");
            Vec::new()
        })
        .into_iter()
        .collect();

    let has_next = registry_cars.len() >= PAGE_SIZE as usize;
    let cars = services::merge_listing(page, &user_cars, registry_cars)
        .into_iter()
        .map(|car| ListedCar {
            favorite: favorite_plates.contains(&car.mispar_rechev),
            car,
        })
        .collect();

    Ok(Json(CarListResponse {
        search,
        page,
        has_previous: page > 1,
        has_next,
        cars,
    }))
}

/// GET /car/:plate
#[instrument(skip(state))]
pub async fn get_car(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(plate): Path<String>,
) -> Result<Json<CarDetails>, AppError> {
    let plate = plate.trim();
    let (car, tav_neche) = tokio::join!(
        services::find_car(&state, plate),
        state.registry.has_tav_neche(plate),
    );

    let car = car
        .map_err(|e| AppError::Upstream(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Car not found".into()))?;
    let tav_neche = tav_neche.map_err(|e| AppError::Upstream(e.to_string()))?;

    Ok(Json(CarDetails { car, tav_neche }))
}

/// POST /car/add
#[instrument(skip(state, body))]
pub async fn add_car(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<AddCarRequest>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<Car>), AppError> {
    let car = services::add_car(&state, user_id, body).await?;
    let location = format!("/car/{}", car.mispar_rechev);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(car)))
}

/// GET /car/add/plate
#[instrument(skip(state))]
pub async fn generate_plate(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> Result<Json<GeneratedPlate>, AppError> {
    let plate = services::generate_plate(&state).await?;
    Ok(Json(GeneratedPlate { plate }))
}
