use axum::Router;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/conflicts", get(routes::conflicts::get_conflicts))
        .route(
            "/conflict-countries",
            get(routes::conflicts::get_conflict_countries),
        )
        .route("/health", get(routes::api::health))
        .route("/metrics", get(routes::api::metrics))
        .route("/cache/clear", post(routes::api::cache_clear))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::store::DatasetStore;

    fn app() -> Router {
        build_app(AppState::with_options(
            DatasetStore::default(),
            false,
            3600,
            50_000,
        ))
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("*")
        );
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/nowhere")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
