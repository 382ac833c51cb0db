//! DTOs for the short link endpoints.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::LazyLock;
use validator::Validate;

use crate::application::services::link_service::CreateLink;
use crate::domain::entities::{Link, TrackingParams};

/// Characters allowed in a custom slug.
static CUSTOM_SLUG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Request to create a short link.
///
/// ```json
/// {
///   "original_url": "https://example.com/landing",
///   "custom_slug": "spring-sale",
///   "expiration_date": "2030-01-01T00:00:00Z",
///   "utm_parameters": { "utm_source": "newsletter" }
/// }
/// ```
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUrlRequest {
    /// Absolute http(s) destination.
    #[serde(alias = "url")]
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub original_url: String,

    /// Empty or whitespace-only counts as no slug.
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(min = 3, max = 50, message = "Custom slug must be 3-50 characters"))]
    #[validate(regex(
        path = "*CUSTOM_SLUG_REGEX",
        message = "Custom slug can only contain letters, digits, hyphens and underscores"
    ))]
    pub custom_slug: Option<String>,

    /// After this instant the link answers 410 Gone.
    #[serde(alias = "expires_at")]
    pub expiration_date: Option<DateTime<Utc>>,

    /// Appended to the destination query string on every redirect.
    pub utm_parameters: Option<TrackingParams>,
}

fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

impl From<CreateUrlRequest> for CreateLink {
    fn from(req: CreateUrlRequest) -> Self {
        Self {
            long_url: req.original_url,
            custom_slug: req.custom_slug,
            expires_at: req.expiration_date,
            utm_params: req.utm_parameters,
        }
    }
}

/// A stored short link as returned by the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct UrlResponse {
    pub id: i64,
    pub original_url: String,
    pub short_code: String,
    pub custom_slug: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub utm_parameters: Option<TrackingParams>,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub short_url: String,
    pub is_expired: bool,
}

impl UrlResponse {
    pub fn new(link: Link, short_url: String, is_expired: bool) -> Self {
        Self {
            id: link.id,
            original_url: link.long_url,
            short_code: link.code,
            custom_slug: link.custom_slug,
            expiration_date: link.expires_at,
            utm_parameters: link.utm_params,
            click_count: link.click_count,
            created_at: link.created_at,
            updated_at: link.updated_at,
            short_url,
            is_expired,
        }
    }
}
