use super::api::ApiDoc;
use crate::app::state::{AppConfig, AppState};
use axum::{
    extract::State,
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use std::time::Duration;
use tower_http::{
    classify::ServerErrorsFailureClass,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub(super) mod collection;

/// Build the application router.
///
/// * `origins`: CORS allowed origins; any origin is allowed if empty.
pub fn router(state: AppState, origins: Vec<String>) -> Router {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins = origins.into_iter().filter_map(|origin| {
            tracing::info!("Adding {origin} to allowed origins");
            match HeaderValue::from_str(&origin) {
                Ok(origin) => Some(origin),
                Err(e) => {
                    tracing::warn!("Skipping invalid origin '{origin}': {e}");
                    None
                }
            }
        });
        AllowOrigin::list(origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE]);

    use collection::*;

    let info = Router::new()
        .route("/info", get(app_config))
        .with_state(state.clone());

    Router::new()
        .route("/create_collection", post(create_collection))
        .route(
            "/delete_collection/:collection_name",
            delete(delete_collection),
        )
        .route("/get_collections", get(list_collections))
        .route("/search_embbeding", post(search))
        .route("/add_embedding", post(add_embedding))
        .route(
            "/create_if_not_exist/:collection_name",
            post(create_if_not_exist),
        )
        .route("/get_sample/:collection_name", get(get_sample))
        .with_state(state.services.clone())
        .merge(info)
        .layer(
            TraceLayer::new_for_http()
                .on_request(|req: &axum::http::Request<_>, _span: &Span| {
                    let ctype = req
                        .headers()
                        .get("content-type")
                        .map(|v| v.to_str().unwrap_or("none"))
                        .unwrap_or("none");

                    tracing::info!(
                        "Processing request | {} {} | content-type: {ctype}",
                        req.method(),
                        req.uri().path()
                    );
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                        let status = res.status();
                        let ctype = res
                            .headers()
                            .get("content-type")
                            .map(|v| v.to_str().unwrap_or("none"))
                            .unwrap_or("none");

                        tracing::info!(
                            "Sending response | {status} | {}ms | {ctype}",
                            latency.as_millis()
                        );
                    },
                )
                .on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        tracing::error!("Error in request: {error}")
                    },
                ),
        )
        .layer(cors)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Has to go last to exclude all the tracing/cors layers
        .route("/_health", get(health_check))
}

#[utoipa::path(
    get,
    path = "/_health",
    responses(
        (status = 200, description = "Service is up")
    )
)]
async fn health_check() -> impl IntoResponse {
    "OK"
}

#[utoipa::path(
    get,
    path = "/info",
    responses(
        (status = 200, description = "Get app configuration", body = AppConfig),
    )
)]
async fn app_config(state: State<AppState>) -> Json<AppConfig> {
    Json(state.get_configuration())
}
