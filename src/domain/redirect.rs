//! Redirect composition: expiration check and tracking parameter merge.

use chrono::{DateTime, Utc};
use url::Url;

use crate::domain::entities::{Link, TrackingParams};

/// The minimal data needed to serve a redirect for one short code.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLink {
    pub link_id: i64,
    pub long_url: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub utm_params: Option<TrackingParams>,
}

impl From<&Link> for ResolvedLink {
    fn from(link: &Link) -> Self {
        Self {
            link_id: link.id,
            long_url: link.long_url.clone(),
            expires_at: link.expires_at,
            utm_params: link.utm_params.clone(),
        }
    }
}

/// Outcome of resolving a short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    /// Redirect to this target.
    Redirect(String),
    /// Terminal: do not redirect and do not count a click.
    Expired,
}

/// Decides what to do with a resolved link at instant `now`.
///
/// `now >= expires_at` is expired. Otherwise the target is the destination
/// with tracking parameters appended.
///
/// # Errors
///
/// Returns the parse error if tracking parameters are present and the stored
/// destination does not parse as a URL.
pub fn resolve(link: &ResolvedLink, now: DateTime<Utc>) -> Result<RedirectDecision, url::ParseError> {
    if link.expires_at.is_some_and(|e| now >= e) {
        return Ok(RedirectDecision::Expired);
    }

    let target = match &link.utm_params {
        Some(params) if !params.is_empty() => compose_target(&link.long_url, params)?,
        _ => link.long_url.clone(),
    };

    Ok(RedirectDecision::Redirect(target))
}

/// Appends `params` to the destination's query string in stored order.
///
/// Existing query parameters are kept; a parameter with the same name as an
/// existing one is added alongside it, never replacing it.
pub fn compose_target(destination: &str, params: &TrackingParams) -> Result<String, url::ParseError> {
    let mut url = Url::parse(destination)?;
    {
        let mut query = url.query_pairs_mut();
        for (name, value) in params.iter() {
            query.append_pair(name, value);
        }
    }
    Ok(url.into())
}
