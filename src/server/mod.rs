pub mod cache;
pub mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Settings;
use crate::notion::NotionSource;
use crate::page;
use crate::render;
use cache::PageCache;
use webhook::Delivery;

/// The single page this service renders; also the path webhooks revalidate.
pub const PAGE_PATH: &str = "/";

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub source: Option<Arc<dyn NotionSource>>,
    pub cache: Arc<PageCache>,
}

impl AppState {
    pub fn new(settings: Settings, source: Option<Arc<dyn NotionSource>>) -> Self {
        Self {
            settings: Arc::new(settings),
            source,
            cache: Arc::new(PageCache::new()),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(PAGE_PATH, get(home_handler))
        .route("/api/notion/webhook", post(webhook_handler))
        .route("/revalidate", post(revalidate_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn home_handler(State(state): State<AppState>) -> Response {
    if let Some(html) = state.cache.get(PAGE_PATH).await {
        return Html(html).into_response();
    }

    let page_id = match state.settings.notion_credentials() {
        Ok((_, page_id)) => page_id,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };
    let Some(source) = state.source.as_deref() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Notion client is not configured",
        )
            .into_response();
    };

    let generation = state.cache.generation().await;
    match page::fetch_page(source, page_id).await {
        Ok(page) => {
            let html = render::render_page(&page);
            state
                .cache
                .insert_if_current(PAGE_PATH, html.clone(), generation)
                .await;
            Html(html).into_response()
        }
        Err(e) => {
            warn!("Failed to fetch Notion page {}: {:#}", page_id, e);
            (StatusCode::BAD_GATEWAY, "Failed to load content from Notion").into_response()
        }
    }
}

async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match webhook::verify_delivery(&state.settings, &headers, &body) {
        Ok(Delivery::Challenge { token }) => {
            info!("Received Notion webhook verification token: {}", token);
            (
                StatusCode::OK,
                Json(json!({ "ok": true, "verification_token_received": true })),
            )
                .into_response()
        }
        Ok(Delivery::Ignored { reason }) => {
            info!("Ignoring Notion webhook: {}", reason);
            (
                StatusCode::OK,
                Json(json!({ "ok": true, "ignored": true, "reason": reason })),
            )
                .into_response()
        }
        Ok(Delivery::Revalidate) => {
            state.cache.revalidate(PAGE_PATH).await;
            (
                StatusCode::OK,
                Json(json!({ "ok": true, "revalidated": PAGE_PATH })),
            )
                .into_response()
        }
        Err(e) => {
            warn!("Rejected Notion webhook: {}", e);
            (e.status(), Json(json!({ "ok": false, "error": e.to_string() }))).into_response()
        }
    }
}

async fn revalidate_handler(State(state): State<AppState>) -> Redirect {
    state.cache.revalidate(PAGE_PATH).await;
    Redirect::to(PAGE_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebhookMode;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::util::ServiceExt;

    const SECRET: &str = "secret_webhook_token";
    const PAGE_ID: &str = "30ab76f65e6e809e881ff95294eaac61";

    struct FixtureSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NotionSource for FixtureSource {
        async fn retrieve_page(&self, _page_id: &str) -> Result<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = std::fs::read_to_string("tests/fixtures/page.json")?;
            Ok(serde_json::from_str(&text)?)
        }

        async fn list_block_children(&self, _block_id: &str) -> Result<Vec<serde_json::Value>> {
            let text = std::fs::read_to_string("tests/fixtures/blocks.json")?;
            Ok(serde_json::from_str(&text)?)
        }
    }

    fn settings() -> Settings {
        Settings {
            notion_api_key: Some("secret_api".into()),
            notion_page_id: Some(PAGE_ID.into()),
            webhook_secret: Some(SECRET.into()),
            webhook_mode: WebhookMode::Signature,
        }
    }

    fn state_with_source() -> (AppState, Arc<FixtureSource>) {
        let source = Arc::new(FixtureSource {
            calls: AtomicUsize::new(0),
        });
        let state = AppState::new(settings(), Some(source.clone() as Arc<dyn NotionSource>));
        (state, source)
    }

    fn get_home() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    fn webhook_request(body: &[u8], signature: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/notion/webhook")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(sig) = signature {
            builder = builder.header(webhook::SIGNATURE_HEADER, sig);
        }
        builder.body(Body::from(body.to_vec())).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn content_event() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "type": "page.content_updated",
            "entity": { "id": "30ab76f6-5e6e-809e-881f-f95294eaac61", "type": "page" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn home_renders_and_caches() {
        let (state, source) = state_with_source();
        let app = create_app(state.clone());

        let response = app.clone().oneshot(get_home()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(html.to_vec()).unwrap();
        assert!(html.contains("<h1 class=\"title\">Writings</h1>"));
        assert!(html.contains("March 14, 2025"));
        assert!(html.contains("<button type=\"button\" class=\"button\">Subscribe</button>"));

        let response = app.oneshot(get_home()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    /// Holds `retrieve_page` until the test releases it.
    struct GatedSource {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
        inner: FixtureSource,
    }

    #[async_trait]
    impl NotionSource for GatedSource {
        async fn retrieve_page(&self, page_id: &str) -> Result<serde_json::Value> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.retrieve_page(page_id).await
        }

        async fn list_block_children(&self, block_id: &str) -> Result<Vec<serde_json::Value>> {
            self.inner.list_block_children(block_id).await
        }
    }

    #[tokio::test]
    async fn revalidation_during_fetch_is_not_lost() {
        let source = Arc::new(GatedSource {
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
            inner: FixtureSource {
                calls: AtomicUsize::new(0),
            },
        });
        let state = AppState::new(settings(), Some(source.clone() as Arc<dyn NotionSource>));
        let app = create_app(state.clone());

        let pending = tokio::spawn(app.clone().oneshot(get_home()));
        source.entered.notified().await;

        let body = content_event();
        let sig = webhook::sign(SECRET, &body);
        let response = app.oneshot(webhook_request(&body, Some(&sig))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        source.release.notify_one();
        let response = pending.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.cache.get(PAGE_PATH).await.is_none());
    }

    #[tokio::test]
    async fn home_without_credentials() {
        let mut s = settings();
        s.notion_api_key = None;
        let app = create_app(AppState::new(s, None));
        let response = app.oneshot(get_home()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn signed_webhook_revalidates_home() {
        let (state, _) = state_with_source();
        state.cache.insert(PAGE_PATH, "stale".to_string()).await;
        let app = create_app(state.clone());

        let body = content_event();
        let sig = webhook::sign(SECRET, &body);
        let response = app.oneshot(webhook_request(&body, Some(&sig))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "ok": true, "revalidated": "/" }));
        assert!(state.cache.get(PAGE_PATH).await.is_none());
    }

    #[tokio::test]
    async fn tampered_signature_is_unauthorized() {
        let (state, _) = state_with_source();
        state.cache.insert(PAGE_PATH, "cached".to_string()).await;
        let app = create_app(state.clone());

        let body = content_event();
        let mut sig = webhook::sign(SECRET, &body);
        let last = if sig.ends_with('0') { "1" } else { "0" };
        sig.replace_range(sig.len() - 1.., last);
        let response = app.oneshot(webhook_request(&body, Some(&sig))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["ok"], json!(false));
        assert!(state.cache.get(PAGE_PATH).await.is_some());
    }

    #[tokio::test]
    async fn verification_challenge_does_not_revalidate() {
        let (state, _) = state_with_source();
        state.cache.insert(PAGE_PATH, "cached".to_string()).await;
        let app = create_app(state.clone());

        let response = app
            .oneshot(webhook_request(br#"{"verification_token": "abc"}"#, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.cache.get(PAGE_PATH).await.is_some());
    }

    #[tokio::test]
    async fn webhook_error_statuses() {
        let (state, _) = state_with_source();
        let app = create_app(state);

        let response = app.clone().oneshot(webhook_request(b"not json", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.oneshot(webhook_request(&content_event(), None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut s = settings();
        s.webhook_secret = None;
        let app = create_app(AppState::new(s, None));
        let response = app.oneshot(webhook_request(&content_event(), Some("sha256=00"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["error"],
            json!("Missing NOTION_WEBHOOK_VERIFICATION_TOKEN")
        );
    }

    #[tokio::test]
    async fn ignored_event_keeps_cache() {
        let (state, _) = state_with_source();
        state.cache.insert(PAGE_PATH, "cached".to_string()).await;
        let app = create_app(state.clone());

        let body = serde_json::to_vec(&json!({
            "type": "comment.created",
            "entity": { "id": "c1", "type": "comment" }
        }))
        .unwrap();
        let sig = webhook::sign(SECRET, &body);
        let response = app.oneshot(webhook_request(&body, Some(&sig))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["ignored"], json!(true));
        assert!(state.cache.get(PAGE_PATH).await.is_some());
    }

    #[tokio::test]
    async fn refresh_button_revalidates_and_redirects() {
        let (state, _) = state_with_source();
        state.cache.insert(PAGE_PATH, "cached".to_string()).await;
        let app = create_app(state.clone());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/revalidate")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(state.cache.get(PAGE_PATH).await.is_none());
    }

    #[tokio::test]
    async fn webhook_rejects_get() {
        let (state, _) = state_with_source();
        let app = create_app(state);
        let request = Request::builder()
            .uri("/api/notion/webhook")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
