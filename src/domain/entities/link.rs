//! Link entity representing a shortened URL record.

use chrono::{DateTime, Utc};

use super::tracking::TrackingParams;

/// A stored short link.
///
/// `code` is unique across all records. When the link was created with a
/// custom slug, `custom_slug` holds that slug and it equals `code`.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: i64,
    pub code: String,
    pub long_url: String,
    pub custom_slug: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub utm_params: Option<TrackingParams>,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Link {
    /// Returns true if the link is expired at `now` (the expiry instant
    /// itself counts as expired).
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }
}

/// Input data for inserting a new link.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub code: String,
    pub long_url: String,
    pub custom_slug: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub utm_params: Option<TrackingParams>,
}

impl NewLink {
    /// Materializes the record a store would hold after inserting this input.
    pub fn into_link(self, id: i64, now: DateTime<Utc>) -> Link {
        Link {
            id,
            code: self.code,
            long_url: self.long_url,
            custom_slug: self.custom_slug,
            expires_at: self.expires_at,
            utm_params: self.utm_params,
            click_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validated creation request, before a code has been allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDraft {
    pub long_url: String,
    pub custom_slug: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub utm_params: Option<TrackingParams>,
}

impl LinkDraft {
    pub fn new(long_url: impl Into<String>) -> Self {
        Self {
            long_url: long_url.into(),
            custom_slug: None,
            expires_at: None,
            utm_params: None,
        }
    }

    /// Attaches an allocated code, producing the insert payload.
    pub fn with_code(&self, code: String) -> NewLink {
        NewLink {
            custom_slug: self.custom_slug.as_ref().map(|_| code.clone()),
            code,
            long_url: self.long_url.clone(),
            expires_at: self.expires_at,
            utm_params: self.utm_params.clone(),
        }
    }
}
