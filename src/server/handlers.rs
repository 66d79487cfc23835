use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use super::ServerState;
use crate::{
    clip::{Clip, ClipSubmission},
    ClipSyncError, Result,
};

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// POST /clip
pub async fn submit_handler(State(state): State<ServerState>, body: Bytes) -> Response {
    let clip = match parse_submission(&body) {
        Ok(clip) => clip,
        Err(e) => {
            let reason = match e {
                ClipSyncError::MalformedRequest(reason) => reason,
                other => other.to_string(),
            };
            warn!("Rejected clip submission: {}", reason);
            return error_response(StatusCode::BAD_REQUEST, &reason);
        }
    };

    let stored = state.store.submit(clip).await;
    info!(
        "Received {} clip from {} ({} bytes)",
        stored.clip_type,
        stored.source,
        stored.data.len()
    );

    Json(json!({ "status": "ok" })).into_response()
}

// GET /clip and GET /clip/latest
pub async fn fetch_handler(State(state): State<ServerState>) -> Response {
    match state.store.fetch().await {
        Some(clip) => Json(clip.as_ref()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No clip available"),
    }
}

pub async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

fn parse_submission(body: &[u8]) -> Result<Clip> {
    if body.is_empty() {
        return Err(ClipSyncError::MalformedRequest("Missing body".to_string()));
    }

    let submission: ClipSubmission = serde_json::from_slice(body)
        .map_err(|e| ClipSyncError::MalformedRequest(format!("Invalid JSON: {e}")))?;

    submission.into_clip(chrono::Utc::now().timestamp())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use crate::clip::Source;
    use crate::server::router;
    use crate::store::ClipStore;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/clip")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_before_submit_returns_not_found_marker() {
        let app = router(Arc::new(ClipStore::new()));
        let (status, body) = send(&app, get("/clip/latest")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "No clip available"}));
    }

    #[tokio::test]
    async fn test_submit_then_fetch_roundtrip() {
        let app = router(Arc::new(ClipStore::new()));
        let submitted = json!({
            "type": "text",
            "data": "hello",
            "mime": "text/plain",
            "source": "phone"
        });

        let (status, body) = send(&app, post(submitted.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));

        let (status, body) = send(&app, get("/clip/latest")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "text");
        assert_eq!(body["data"], "hello");
        assert_eq!(body["mime"], "text/plain");
        assert_eq!(body["source"], "phone");
        assert!(body["createdAt"].is_i64());
    }

    #[tokio::test]
    async fn test_second_submit_replaces_first() {
        let app = router(Arc::new(ClipStore::new()));
        send(
            &app,
            post(json!({"type": "text", "data": "hello", "mime": "text/plain", "source": "phone"}).to_string()),
        )
        .await;
        send(
            &app,
            post(json!({"type": "text", "data": "world", "source": "pc"}).to_string()),
        )
        .await;

        let (_, body) = send(&app, get("/clip")).await;
        assert_eq!(body["data"], "world");
        assert_eq!(body["source"], "pc");
        assert_eq!(body["mime"], "text/plain");
    }

    #[tokio::test]
    async fn test_missing_type_rejected_without_mutation() {
        let store = Arc::new(ClipStore::new());
        let app = router(store.clone());
        send(
            &app,
            post(json!({"type": "text", "data": "keep", "source": "phone"}).to_string()),
        )
        .await;

        let (status, body) = send(&app, post(json!({"data": "lost"}).to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let current = store.fetch().await.unwrap();
        assert_eq!(current.data, "keep");
        assert_eq!(current.source, Source::Phone);
    }

    #[tokio::test]
    async fn test_invalid_json_and_empty_body_rejected() {
        let app = router(Arc::new(ClipStore::new()));

        let (status, _) = send(&app, post("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, post(Body::empty())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing body"}));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = router(Arc::new(ClipStore::new()));
        let (status, body) = send(&app, get("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not found"}));
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(Arc::new(ClipStore::new()));
        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_cors_preflight_allowed() {
        let app = router(Arc::new(ClipStore::new()));
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/clip")
            .header("origin", "http://phone.local")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));
    }
}
