//! Notion webhook verification.
//!
//! A delivery moves through: secret configured, body parsed, caller verified,
//! event accepted. Each failed step is terminal and maps to one HTTP status.

use axum::http::{HeaderMap, StatusCode};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::config::{Settings, WebhookMode};

pub const SIGNATURE_HEADER: &str = "x-notion-signature";
pub const TOKEN_HEADER: &str = "x-notion-webhook-token";
const SIGNATURE_PREFIX: &str = "sha256=";

/// Event types that change what the page shows.
const PAGE_EVENTS: &[&str] = &[
    "page.content_updated",
    "page.properties_updated",
    "page.created",
    "page.deleted",
    "page.undeleted",
];

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Missing NOTION_WEBHOOK_VERIFICATION_TOKEN")]
    MissingSecret,
    #[error("Invalid JSON body")]
    InvalidJson,
    #[error("Missing {0} header")]
    MissingCredential(&'static str),
    #[error("Untrusted payload")]
    Untrusted,
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::MissingSecret => StatusCode::INTERNAL_SERVER_ERROR,
            WebhookError::InvalidJson | WebhookError::MissingCredential(_) => StatusCode::BAD_REQUEST,
            WebhookError::Untrusted => StatusCode::UNAUTHORIZED,
        }
    }
}

/// What a verified delivery asks us to do.
#[derive(Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Endpoint ownership handshake; nothing to revalidate.
    Challenge { token: String },
    /// Authentic, but not about our page content.
    Ignored { reason: String },
    Revalidate,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type")]
    kind: Option<String>,
    entity: Option<Entity>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Run a delivery through every check. `body` must be the raw request bytes:
/// the signature covers them exactly.
pub fn verify_delivery(
    settings: &Settings,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Delivery, WebhookError> {
    let secret = settings.webhook_secret().ok_or(WebhookError::MissingSecret)?;

    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| WebhookError::InvalidJson)?;

    if let Some(token) = challenge_token(&value) {
        return Ok(Delivery::Challenge { token });
    }

    match settings.webhook_mode {
        WebhookMode::Signature => {
            let header = header_str(headers, SIGNATURE_HEADER)?;
            if !signature_matches(secret, body, header) {
                return Err(WebhookError::Untrusted);
            }
        }
        WebhookMode::Token => {
            let header = header_str(headers, TOKEN_HEADER)?;
            if !constant_time_eq(header.as_bytes(), secret.as_bytes()) {
                return Err(WebhookError::Untrusted);
            }
        }
    }

    Ok(classify_event(value, settings.notion_page_id.as_deref()))
}

/// `{"verification_token": "..."}` and nothing else.
fn challenge_token(value: &serde_json::Value) -> Option<String> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object
        .get("verification_token")?
        .as_str()
        .map(str::to_string)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, WebhookError> {
    let value = headers
        .get(name)
        .ok_or(WebhookError::MissingCredential(name))?;
    value.to_str().map_err(|_| WebhookError::Untrusted)
}

/// `sha256=<lowercase hex>` header against HMAC-SHA256(secret, body). The
/// whole header string is compared in constant time.
fn signature_matches(secret: &str, body: &[u8], header: &str) -> bool {
    match expected_signature(secret, body) {
        Some(expected) => constant_time_eq(header.as_bytes(), expected.as_bytes()),
        None => false,
    }
}

fn expected_signature(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes())))
}

/// Header value a sender would use for `body` under `secret`.
#[cfg(test)]
pub fn sign(secret: &str, body: &[u8]) -> String {
    expected_signature(secret, body).unwrap()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn classify_event(value: serde_json::Value, page_id: Option<&str>) -> Delivery {
    let Ok(event) = serde_json::from_value::<Event>(value) else {
        return ignored("unrecognized event shape");
    };

    let kind = event.kind.unwrap_or_default();
    let entity_kind = event.entity.as_ref().and_then(|e| e.kind.as_deref());
    if !PAGE_EVENTS.contains(&kind.as_str()) || entity_kind != Some("page") {
        return ignored(&format!("event type {:?} does not affect page content", kind));
    }

    if let Some(expected) = page_id {
        let entity_id = event.entity.and_then(|e| e.id).unwrap_or_default();
        if normalize_id(&entity_id) != normalize_id(expected) {
            return ignored(&format!("event is for page {}", entity_id));
        }
    }

    Delivery::Revalidate
}

fn ignored(reason: &str) -> Delivery {
    Delivery::Ignored {
        reason: reason.to_string(),
    }
}

/// Notion ids appear both dashed and undashed, in either case.
pub fn normalize_id(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
