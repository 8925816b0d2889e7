use serde::{Deserialize, Deserializer, Serialize};

use crate::registry::Car;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<u32>,
}

/// `page=` or `page=abc` falls back to the first page instead of a 400.
fn lenient_page<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

impl ListQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

/// One row of the car table.
#[derive(Debug, Serialize)]
pub struct ListedCar {
    #[serde(flatten)]
    pub car: Car,
    pub favorite: bool,
}

#[derive(Debug, Serialize)]
pub struct CarListResponse {
    pub search: String,
    pub page: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub cars: Vec<ListedCar>,
}

#[derive(Debug, Serialize)]
pub struct CarDetails {
    pub car: Car,
    pub tav_neche: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddCarRequest {
    pub plate: String,
    pub manufacturer: String,
    pub model: String,
    pub year: String,
}

#[derive(Debug, Serialize)]
pub struct GeneratedPlate {
    pub plate: String,
}
