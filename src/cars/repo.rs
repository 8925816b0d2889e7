use sqlx::PgPool;

use super::repo_types::{NewCar, UserCar};

const COLUMNS: &str = "id, user_id, plate, manufacturer, model, year, created_at";

/// Cars submitted by one user, newest first.
pub async fn list_by_user(db: &PgPool, user_id: i64) -> Result<Vec<UserCar>, sqlx::Error> {
    sqlx::query_as::<_, UserCar>(&format!(
        "SELECT {COLUMNS} FROM user_cars WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Any user's car with this plate.
pub async fn find_by_plate(db: &PgPool, plate: &str) -> Result<Option<UserCar>, sqlx::Error> {
    sqlx::query_as::<_, UserCar>(&format!(
        "SELECT {COLUMNS} FROM user_cars WHERE plate = $1 LIMIT 1"
    ))
    .bind(plate)
    .fetch_optional(db)
    .await
}

pub async fn insert(db: &PgPool, user_id: i64, car: &NewCar) -> Result<UserCar, sqlx::Error> {
    sqlx::query_as::<_, UserCar>(&format!(
        r#"
        INSERT INTO user_cars (user_id, plate, manufacturer, model, year)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&car.plate)
    .bind(&car.manufacturer)
    .bind(&car.model)
    .bind(car.year)
    .fetch_one(db)
    .await
}
