use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::registry::Car;

/// Car submitted by a signed-in user.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserCar {
    pub id: i64,
    pub user_id: i64,
    pub plate: String,
    pub manufacturer: String,
    pub model: String,
    pub year: i32,
    pub created_at: OffsetDateTime,
}

/// Validated form input, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCar {
    pub plate: String,
    pub manufacturer: String,
    pub model: String,
    pub year: i32,
}

impl From<UserCar> for Car {
    fn from(uc: UserCar) -> Self {
        Car {
            mispar_rechev: uc.plate,
            tozeret_nm: Some(uc.manufacturer),
            degem_nm: Some(uc.model),
            shnat_yitzur: Some(i64::from(uc.year)),
            is_user_car: true,
            ..Default::default()
        }
    }
}
