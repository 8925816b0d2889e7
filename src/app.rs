use std::net::SocketAddr;

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, cars, favorites};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(cars::router())
        .merge(favorites::router())
        .route("/health", get(|| async { "ok" }))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::gate::require_session,
        ))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::SessionKeys;
    use crate::state::testing::FakeRegistry;
    use axum::{
        body::{to_bytes, Body},
        extract::FromRef,
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn session_cookie(state: &AppState, user_id: i64) -> String {
        let token = SessionKeys::from_ref(state).sign(user_id).unwrap();
        format!("session={}", token)
    }

    async fn json_body(res: axum::response::Response) -> Value {
        let bytes = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_as(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        req.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let res = app.oneshot(get_as("/health", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn anonymous_protected_requests_redirect_to_restricted() {
        for path in ["/car", "/car/1234567", "/car/add/plate", "/account"] {
            let app = build_app(AppState::fake());
            let res = app.oneshot(get_as(path, None)).await.unwrap();
            assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT, "{path}");
            assert_eq!(res.headers()[header::LOCATION], "/restricted", "{path}");
        }
    }

    #[tokio::test]
    async fn forged_session_is_treated_as_anonymous() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(get_as("/car", Some("session=forged")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn restricted_and_home_pages_are_public() {
        let app = build_app(AppState::fake());
        let res = app.clone().oneshot(get_as("/restricted", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["title"], "Access Restricted");
        assert_eq!(body["signed_in"], false);

        let res = app.oneshot(get_as("/", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn signed_in_listing_shows_registry_page() {
        let plates: Vec<String> = (0..12).map(|i| format!("10000{:02}", i)).collect();
        let refs: Vec<&str> = plates.iter().map(String::as_str).collect();
        let state = AppState::fake_with(FakeRegistry::with_plates(&refs));
        let cookie = session_cookie(&state, 1);
        let app = build_app(state);

        let res = app
            .clone()
            .oneshot(get_as("/car", Some(cookie.as_str())))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["page"], 1);
        assert_eq!(body["has_previous"], false);
        assert_eq!(body["has_next"], true);
        let cars = body["cars"].as_array().unwrap();
        assert_eq!(cars.len(), 10);
        assert_eq!(cars[0]["mispar_rechev"], "1000000");
        assert_eq!(cars[0]["favorite"], false);

        let res = app
            .clone()
            .oneshot(get_as("/car?page=2", Some(cookie.as_str())))
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(body["has_previous"], true);
        assert_eq!(body["has_next"], false);
        let cars = body["cars"].as_array().unwrap();
        assert_eq!(cars.len(), 2);
        assert!(cars.iter().all(|c| c["is_user_car"] == false));

        let res = app
            .oneshot(get_as("/car?search=&page=", Some(cookie.as_str())))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["page"], 1);
    }

    #[tokio::test]
    async fn car_details_include_tav_neche() {
        let mut registry = FakeRegistry::with_plates(&["8190433"]);
        registry.tav_plates.push("8190433".into());
        let state = AppState::fake_with(registry);
        let cookie = session_cookie(&state, 1);
        let app = build_app(state);

        let res = app
            .clone()
            .oneshot(get_as("/car/8190433", Some(cookie.as_str())))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["car"]["mispar_rechev"], "8190433");
        assert_eq!(body["tav_neche"], true);

        let res = app
            .oneshot(get_as("/car/5555555", Some(cookie.as_str())))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(res).await["error"], "Car not found");
    }

    #[tokio::test]
    async fn adding_known_plate_conflicts() {
        let state = AppState::fake_with(FakeRegistry::with_plates(&["8190433"]));
        let cookie = session_cookie(&state, 1);
        let app = build_app(state);

        let req = Request::builder()
            .method("POST")
            .uri("/car/add")
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"plate":"8190433","manufacturer":"Toyota","model":"Corolla","year":"2014"}"#,
            ))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(res).await["error"], "Plate 8190433 already exists.");

        let req = Request::builder()
            .method("POST")
            .uri("/car/add")
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"plate":"81","manufacturer":"Toyota","model":"Corolla","year":"2014"}"#,
            ))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn generated_plate_is_free() {
        let state = AppState::fake();
        let cookie = session_cookie(&state, 1);
        let app = build_app(state);
        let res = app
            .oneshot(get_as("/car/add/plate", Some(cookie.as_str())))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let plate = json_body(res).await["plate"].as_str().unwrap().to_string();
        assert_eq!(plate.len(), 7);
    }
}
