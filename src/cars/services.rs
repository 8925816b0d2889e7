use std::collections::HashSet;

use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use tracing::{debug, error, info};

use super::dto::AddCarRequest;
use super::repo;
use super::repo_types::{NewCar, UserCar};
use crate::error::AppError;
use crate::registry::Car;
use crate::state::AppState;

const PLATE_ATTEMPTS: usize = 20;

/// Page 1 shows the user's own cars first; registry rows whose plate the
/// user already owns are dropped on every page.
pub fn merge_listing(page: u32, user_cars: &[UserCar], registry_cars: Vec<Car>) -> Vec<Car> {
    let own: HashSet<&str> = user_cars.iter().map(|c| c.plate.as_str()).collect();

    let mut merged = Vec::with_capacity(user_cars.len() + registry_cars.len());
    if page <= 1 {
        merged.extend(user_cars.iter().cloned().map(Car::from));
    }
    merged.extend(
        registry_cars
            .into_iter()
            .filter(|c| !own.contains(c.mispar_rechev.as_str()))
            .map(|mut c| {
                c.is_user_car = false;
                c
            }),
    );
    merged
}

/// Looks the plate up among user cars first, then in the registry.
pub async fn find_car(state: &AppState, plate: &str) -> anyhow::Result<Option<Car>> {
    match repo::find_by_plate(&state.db, plate).await {
        Ok(Some(uc)) => return Ok(Some(uc.into())),
        Ok(None) => {}
        Err(e) => error!(error = %e, plate, "user car lookup failed; falling back to registry"),
    }

    // registry plates are numeric; anything else cannot be there
    if plate.is_empty() || !plate.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    state.registry.find_plate(plate).await
}

fn is_valid_plate(plate: &str) -> bool {
    lazy_static! {
        static ref PLATE_RE: Regex = Regex::new(r"^\d{6,}$").unwrap();
    }
    PLATE_RE.is_match(plate)
}

fn is_valid_year(year: &str) -> bool {
    lazy_static! {
        static ref YEAR_RE: Regex = Regex::new(r"^\d{4}$").unwrap();
    }
    YEAR_RE.is_match(year)
}

pub fn validate(req: AddCarRequest) -> Result<NewCar, AppError> {
    let plate = req.plate.trim();
    let manufacturer = req.manufacturer.trim();
    let model = req.model.trim();
    let year = req.year.trim();

    if !is_valid_plate(plate) {
        return Err(AppError::Validation(
            "Plate number must have at least 6 digits".into(),
        ));
    }
    if manufacturer.is_empty() {
        return Err(AppError::Validation("Please select a manufacturer".into()));
    }
    if model.is_empty() {
        return Err(AppError::Validation("Please select a model".into()));
    }
    let year = match year.parse::<i32>() {
        Ok(y) if is_valid_year(year) => y,
        _ => {
            return Err(AppError::Validation(
                "Enter a valid year (e.g. 2019)".into(),
            ))
        }
    };

    Ok(NewCar {
        plate: plate.to_string(),
        manufacturer: manufacturer.to_string(),
        model: model.to_string(),
        year,
    })
}

/// Validates, rejects plates that already exist anywhere, then inserts.
pub async fn add_car(state: &AppState, user_id: i64, req: AddCarRequest) -> Result<Car, AppError> {
    let car = validate(req)?;

    let existing = find_car(state, &car.plate)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    if existing.is_some() {
        debug!(plate = %car.plate, "plate already exists");
        return Err(AppError::Conflict(format!(
            "Plate {} already exists.",
            car.plate
        )));
    }

    let stored = repo::insert(&state.db, user_id, &car).await?;
    info!(user_id, plate = %stored.plate, "car added");
    Ok(stored.into())
}

fn random_plate() -> String {
    rand::thread_rng().gen_range(1_000_000..=9_999_999).to_string()
}

/// A random 7-digit plate no user car or registry record uses.
pub async fn generate_plate(state: &AppState) -> Result<String, AppError> {
    for _ in 0..PLATE_ATTEMPTS {
        let plate = random_plate();
        let existing = find_car(state, &plate)
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;
        if existing.is_none() {
            return Ok(plate);
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "no free plate after {} attempts",
        PLATE_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{registry_car, FakeRegistry};
    use time::OffsetDateTime;

    fn user_car(plate: &str) -> UserCar {
        UserCar {
            id: 1,
            user_id: 1,
            plate: plate.into(),
            manufacturer: "Kia".into(),
            model: "Picanto".into(),
            year: 2021,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn plates(cars: &[Car]) -> Vec<&str> {
        cars.iter().map(|c| c.mispar_rechev.as_str()).collect()
    }

    fn request(plate: &str, year: &str) -> AddCarRequest {
        AddCarRequest {
            plate: plate.into(),
            manufacturer: "Kia".into(),
            model: "Picanto".into(),
            year: year.into(),
        }
    }

    #[test]
    fn first_page_puts_user_cars_first_without_duplicates() {
        let mine = vec![user_car("5555555"), user_car("1111111")];
        let registry = vec![registry_car("1111111"), registry_car("2222222")];
        let merged = merge_listing(1, &mine, registry);

        assert_eq!(plates(&merged), vec!["5555555", "1111111", "2222222"]);
        assert!(merged[0].is_user_car && merged[1].is_user_car);
        assert!(!merged[2].is_user_car);
        // the kept 1111111 is the user's version
        assert_eq!(merged[1].tozeret_nm.as_deref(), Some("Kia"));
    }

    #[test]
    fn later_pages_show_only_registry_cars() {
        let mine = vec![user_car("5555555")];
        let registry = vec![registry_car("3333333"), registry_car("4444444")];
        let merged = merge_listing(2, &mine, registry);
        assert_eq!(plates(&merged), vec!["3333333", "4444444"]);
        assert!(merged.iter().all(|c| !c.is_user_car));
    }

    #[test]
    fn merge_without_user_cars_is_registry_page() {
        let merged = merge_listing(1, &[], vec![registry_car("1234567")]);
        assert_eq!(plates(&merged), vec!["1234567"]);
    }

    #[test]
    fn validation_accepts_well_formed_input() {
        let car = validate(request(" 1234567 ", "2019")).unwrap();
        assert_eq!(
            car,
            NewCar {
                plate: "1234567".into(),
                manufacturer: "Kia".into(),
                model: "Picanto".into(),
                year: 2019,
            }
        );
    }

    #[test]
    fn validation_rejects_bad_fields() {
        for (plate, year) in [("12345", "2019"), ("12a4567", "2019"), ("1234567", "19"), ("1234567", "20x9")] {
            let err = validate(request(plate, year)).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{plate} {year}");
        }
        let mut req = request("1234567", "2019");
        req.manufacturer = "  ".into();
        assert_eq!(
            validate(req).unwrap_err().to_string(),
            "Please select a manufacturer"
        );
        let mut req = request("1234567", "2019");
        req.model = String::new();
        assert_eq!(validate(req).unwrap_err().to_string(), "Please select a model");
    }

    #[test]
    fn random_plates_have_seven_digits() {
        for _ in 0..100 {
            let plate = random_plate();
            assert_eq!(plate.len(), 7);
            assert!(is_valid_plate(&plate));
        }
    }

    #[tokio::test]
    async fn find_car_requires_exact_plate() {
        let state = AppState::fake_with(FakeRegistry::with_plates(&["12345678"]));
        assert!(find_car(&state, "1234567").await.unwrap().is_none());
        let car = find_car(&state, "12345678").await.unwrap().unwrap();
        assert_eq!(car.mispar_rechev, "12345678");
        assert!(find_car(&state, "abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_car_is_not_shadowed_by_longer_plate() {
        // a full-text search for 1234567 ranks 12345678 first
        let state = AppState::fake_with(FakeRegistry::with_plates(&["12345678", "1234567"]));
        let car = find_car(&state, "1234567").await.unwrap().unwrap();
        assert_eq!(car.mispar_rechev, "1234567");

        let err = add_car(&state, 1, request("1234567", "2018")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn existing_registry_plate_is_rejected_before_insert() {
        let state = AppState::fake_with(FakeRegistry::with_plates(&["7654321"]));
        let err = add_car(&state, 1, request("7654321", "2018")).await.unwrap_err();
        match err {
            AppError::Conflict(msg) => assert_eq!(msg, "Plate 7654321 already exists."),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_lookup() {
        let state = AppState::fake();
        let err = add_car(&state, 1, request("12", "2018")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
