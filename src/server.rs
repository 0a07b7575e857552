//! HTTP control server.
//!
//! Exposes the control API over HTTP. Parameters are read from the query
//! string and, for form-urlencoded requests, from the body as well.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{FromRequest, Query, Request, State},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::control::{ControlApi, ControlError, ControlParams};
use crate::probe::ProbeInfo;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub control: ControlApi,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    probes: usize,
}

/// Control parameters merged from the body and the query string.
///
/// Body values come first and the first occurrence of a key wins. A request
/// without a form-urlencoded body is read from the query string alone, so
/// missing fields surface as control validation errors rather than rejections.
pub struct ControlForm(pub ControlParams);

impl<S: Send + Sync> FromRequest<S> for ControlForm {
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<Vec<(String, String)>>::try_from_uri(req.uri())
            .map_err(IntoResponse::into_response)?;

        let has_form_body = req.method() != Method::GET
            && req.method() != Method::HEAD
            && req
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let mut pairs = Vec::new();
        if has_form_body {
            let Form(body) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            pairs.extend(body);
        }
        pairs.extend(query);

        Ok(Self(pairs.into_iter().collect()))
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/add", get(add_handler).post(add_handler))
        .route("/remove", get(remove_handler).post(remove_handler))
        .route("/probes", get(probes_handler))
        .route("/healthz", get(healthz_handler))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(app_state)
}

/// Map a control outcome onto a plain-text response.
fn respond(result: Result<String, ControlError>) -> Response {
    match result {
        Ok(msg) => (StatusCode::OK, msg).into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "Control request rejected");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Add or replace a probe: `id`, `url`, `interval` (ms).
async fn add_handler(
    State(state): State<Arc<AppState>>,
    ControlForm(params): ControlForm,
) -> Response {
    respond(state.control.add_probe(&params).await)
}

/// Stop a probe: `id`.
async fn remove_handler(
    State(state): State<Arc<AppState>>,
    ControlForm(params): ControlForm,
) -> Response {
    respond(state.control.remove_probe(&params).await)
}

/// List live probes.
async fn probes_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ProbeInfo>> {
    Json(state.control.registry().list().await)
}

/// Liveness probe.
async fn healthz_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        probes: state.control.registry().len().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeRegistry;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn create_test_state() -> (AppState, mpsc::Receiver<crate::probe::FetchRequest>) {
        let (tx, rx) = mpsc::channel(16);
        let state = AppState {
            control: ControlApi::new(ProbeRegistry::new(tx)),
        };
        (state, rx)
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn test_add_via_query() {
        let (state, _rx) = create_test_state();
        let registry = state.control.registry().clone();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/add?id=acct1&url=http%3A%2F%2Fexample.test%2Fping&interval=60000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Added acct1");
        assert_eq!(registry.get("acct1").await.unwrap().url, "http://example.test/ping");

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_add_via_form_post() {
        let (state, _rx) = create_test_state();
        let registry = state.control.registry().clone();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/add")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("id=web&url=http%3A%2F%2Fexample.test%2F&interval=60000"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(registry.contains("web").await);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_add_via_post_query_without_body() {
        let (state, _rx) = create_test_state();
        let registry = state.control.registry().clone();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/add?id=acct1&url=http%3A%2F%2Fexample.test%2Fping&interval=60000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Added acct1");
        assert!(registry.contains("acct1").await);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_post_empty_body_reports_missing_field() {
        let (state, _rx) = create_test_state();
        let app = create_router(state);

        for (uri, expected) in [("/add", "url is required"), ("/remove", "id is required")] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_text(response).await, expected);
        }
    }

    #[tokio::test]
    async fn test_body_and_query_merge_first_value_wins() {
        let (state, _rx) = create_test_state();
        let registry = state.control.registry().clone();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/add?id=from-query&interval=60000&url=http%3A%2F%2Fquery.test%2F")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("id=from-body&url=http%3A%2F%2Fbody.test%2F&url=http%3A%2F%2Fsecond.test%2F"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Added from-body");
        let info = registry.get("from-body").await.unwrap();
        assert_eq!(info.url, "http://body.test/");
        assert!(!registry.contains("from-query").await);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_add_missing_field() {
        let (state, _rx) = create_test_state();
        let registry = state.control.registry().clone();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/add?id=acct1&interval=1000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "url is required");
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_unknown() {
        let (state, _rx) = create_test_state();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/remove?id=ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Stopped ghost");
    }

    #[tokio::test]
    async fn test_healthz() {
        let (state, _rx) = create_test_state();
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["probes"], 0);
    }
}
