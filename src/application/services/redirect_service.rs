//! Short code resolution for the redirect path.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use serde_json::json;
use tracing::{debug, error, info};

use super::store_timeout::bounded;
use crate::domain::click_event::{ClickEvent, ClickRecorder};
use crate::domain::redirect::{self, RedirectDecision, ResolvedLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::ResolutionCache;
use crate::utils::clock::Clock;

/// Resolves short codes to redirect decisions.
///
/// # Request Flow
///
/// 1. Look the code up in the resolution cache
/// 2. On a miss, load the record from the store and populate the cache
/// 3. Check expiration and compose the target
/// 4. Queue a click for a non-expired resolution
pub struct RedirectService<L: LinkRepository + ?Sized = dyn LinkRepository> {
    repository: Arc<L>,
    cache: Arc<ResolutionCache>,
    clock: Arc<dyn Clock>,
    clicks: ClickRecorder,
    store_timeout: Duration,
}

impl<L: LinkRepository + ?Sized> RedirectService<L> {
    pub fn new(
        repository: Arc<L>,
        cache: Arc<ResolutionCache>,
        clock: Arc<dyn Clock>,
        clicks: ClickRecorder,
        store_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            cache,
            clock,
            clicks,
            store_timeout,
        }
    }

    /// Resolves `code` at the current instant.
    ///
    /// An expired link yields [`RedirectDecision::Expired`] and no click.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if no record has this code
    /// - [`AppError::Internal`] on store failure or timeout, or when the
    ///   target cannot be carried in a `Location` header (no click is queued)
    pub async fn resolve(&self, code: &str) -> Result<RedirectDecision, AppError> {
        let link = match self.cache.lookup(code) {
            Some(link) => link,
            None => self.load(code).await?,
        };

        let now = self.clock.now();
        let decision = redirect::resolve(&link, now).map_err(|e| {
            error!(code, error = %e, "Stored destination does not parse");
            AppError::internal("Corrupt link record", json!({ "code": code }))
        })?;

        match &decision {
            RedirectDecision::Expired => {
                info!(code, "Expired short link accessed");
            }
            RedirectDecision::Redirect(target) => {
                if HeaderValue::from_str(target).is_err() {
                    error!(code, "Stored destination cannot be sent as a Location header");
                    return Err(AppError::internal("Corrupt link record", json!({ "code": code })));
                }
                debug!(code, target = %target, "Redirecting");
                self.clicks.record(ClickEvent::new(link.link_id, code, now));
            }
        }

        Ok(decision)
    }

    async fn load(&self, code: &str) -> Result<ResolvedLink, AppError> {
        let record = bounded(
            self.store_timeout,
            "find_by_code",
            self.repository.find_by_code(code),
        )
        .await?
        .ok_or_else(|| {
            debug!(code, "Unknown short code");
            AppError::link_not_found(json!({ "code": code }))
        })?;

        let resolved = ResolvedLink::from(&record);
        self.cache.insert(code, resolved.clone());
        Ok(resolved)
    }
}
