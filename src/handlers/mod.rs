use std::future::Future;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiFailure, GenerationError};
use crate::schema::{
    BackgroundResponse, DescriptionResponse, HealthResponse, KeywordsResponse,
    ProductDescriptionRequest, ProductKeywordsRequest, ProfileBackgroundRequest,
    ProfileDescriptionRequest, ShootRequest, ShootResponse,
};
use crate::state::AppState;
use crate::utils::timing::{complete_request_timer, start_request_timer};

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/profile-manage/generate-description",
            post(generate_description),
        )
        .route(
            "/api/profile-manage/get-profile-background",
            post(get_profile_background),
        )
        .route(
            "/api/product-manage/generate-professional-shoot",
            post(generate_professional_shoot),
        )
        .route(
            "/api/product-manage/generate-product-keywords",
            post(generate_product_keywords),
        )
        .route(
            "/api/product-manage/generate-product-description",
            post(generate_product_description),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {err}");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

async fn run_endpoint<Req, Resp, F, Fut>(
    endpoint: &str,
    payload: Result<Json<Req>, JsonRejection>,
    validate: fn(&Req) -> Result<(), GenerationError>,
    call: F,
) -> Result<Json<Resp>, ApiFailure>
where
    F: FnOnce(Req) -> Fut,
    Fut: Future<Output = Result<Resp, GenerationError>>,
{
    let request_id = Uuid::new_v4().to_string();
    let mut timer = start_request_timer(endpoint, &request_id);

    let outcome = match payload {
        Ok(Json(request)) => match validate(&request) {
            Ok(()) => call(request).await,
            Err(err) => Err(err),
        },
        Err(rejection) => Err(GenerationError::validation("body", rejection.body_text())),
    };

    match outcome {
        Ok(response) => {
            complete_request_timer(&mut timer, "success", None);
            Ok(Json(response))
        }
        Err(err) => {
            if matches!(err, GenerationError::Validation { .. }) {
                info!(endpoint = endpoint, request_id = %request_id, "Rejected request: {}", err);
            } else {
                warn!(endpoint = endpoint, request_id = %request_id, "Request failed: {}", err);
            }
            complete_request_timer(&mut timer, err.error_type(), Some(err.to_string()));
            Err(err.with_request_id(&request_id))
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn generate_description(
    State(state): State<AppState>,
    payload: Result<Json<ProfileDescriptionRequest>, JsonRejection>,
) -> Result<Json<DescriptionResponse>, ApiFailure> {
    run_endpoint(
        "generate_description",
        payload,
        ProfileDescriptionRequest::validate,
        |request| async move { state.pipeline.generate_profile_description(&request).await },
    )
    .await
}

async fn get_profile_background(
    State(state): State<AppState>,
    payload: Result<Json<ProfileBackgroundRequest>, JsonRejection>,
) -> Result<Json<BackgroundResponse>, ApiFailure> {
    run_endpoint(
        "get_profile_background",
        payload,
        ProfileBackgroundRequest::validate,
        |request| async move { state.pipeline.generate_profile_background(&request).await },
    )
    .await
}

async fn generate_professional_shoot(
    State(state): State<AppState>,
    payload: Result<Json<ShootRequest>, JsonRejection>,
) -> Result<Json<ShootResponse>, ApiFailure> {
    run_endpoint(
        "generate_professional_shoot",
        payload,
        ShootRequest::validate,
        |request| async move { state.pipeline.generate_professional_shoot(&request).await },
    )
    .await
}

async fn generate_product_keywords(
    State(state): State<AppState>,
    payload: Result<Json<ProductKeywordsRequest>, JsonRejection>,
) -> Result<Json<KeywordsResponse>, ApiFailure> {
    run_endpoint(
        "generate_product_keywords",
        payload,
        ProductKeywordsRequest::validate,
        |request| async move { state.pipeline.generate_product_keywords(&request).await },
    )
    .await
}

async fn generate_product_description(
    State(state): State<AppState>,
    payload: Result<Json<ProductDescriptionRequest>, JsonRejection>,
) -> Result<Json<DescriptionResponse>, ApiFailure> {
    run_endpoint(
        "generate_product_description",
        payload,
        ProductDescriptionRequest::validate,
        |request| async move { state.pipeline.generate_product_description(&request).await },
    )
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::pipeline::tests::{pipeline_with, FakeHost, FakeModel};

    fn app(model: FakeModel, host: FakeHost, scratch: &std::path::Path) -> Router {
        let pipeline = pipeline_with(Arc::new(model), Arc::new(host), scratch);
        create_app(AppState::new(pipeline, Vec::new()))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(FakeModel::default(), FakeHost::accepting(), scratch.path())
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn missing_field_is_a_validation_error() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(FakeModel::default(), FakeHost::accepting(), scratch.path())
            .oneshot(post_json(
                "/api/profile-manage/generate-description",
                json!({ "profession": "potter" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error_type"], "validation_error");
        assert!(body["request_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn relative_seed_url_is_rejected() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(FakeModel::with_image(), FakeHost::accepting(), scratch.path())
            .oneshot(post_json(
                "/api/product-manage/generate-professional-shoot",
                json!({ "art_form": "vase", "product_image_url": "vase.png" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn upload_failure_is_not_a_200() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(FakeModel::with_image(), FakeHost::rejecting(), scratch.path())
            .oneshot(post_json(
                "/api/profile-manage/get-profile-background",
                json!({ "profession": "weaver", "location": "Kashmir" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error_type"], "upload_error");
        assert!(body.get("background_url").is_none());
    }

    #[tokio::test]
    async fn keywords_round_trip() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(
            FakeModel::with_text("#KashmirShawl #AshaWeaves #handwoven"),
            FakeHost::accepting(),
            scratch.path(),
        )
        .oneshot(post_json(
            "/api/product-manage/generate-product-keywords",
            json!({
                "profession": "weaver",
                "product_name": "shawl",
                "location": "Kashmir",
                "artist_name": "Asha"
            }),
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "keywords": ["#kashmirshawl", "#ashaweaves", "#handwoven"] })
        );
    }

    #[tokio::test]
    async fn product_description_returns_both_renderings() {
        let scratch = tempfile::tempdir().unwrap();
        let response = app(
            FakeModel::with_text("# Pashmina Shawl\n\n*Woven* by hand."),
            FakeHost::accepting(),
            scratch.path(),
        )
        .oneshot(post_json(
            "/api/product-manage/generate-product-description",
            json!({
                "profession": "weaver",
                "product_name": "shawl",
                "product_description": "pashmina",
                "location": "Kashmir",
                "background": "third generation"
            }),
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["description"], "# Pashmina Shawl\n\n*Woven* by hand.");
        assert_eq!(body["plain_text"], "Pashmina Shawl\n\nWoven by hand.");
    }
}
