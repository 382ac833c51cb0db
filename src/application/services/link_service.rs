//! Link creation, lookup and deletion service.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};

use super::ServiceSettings;
use super::code_allocator::CodeAllocator;
use super::store_timeout::bounded;
use crate::domain::entities::tracking::MAX_TRACKING_PARAMS;
use crate::domain::entities::{Link, LinkDraft, TrackingParams};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::ResolutionCache;
use crate::utils::clock::Clock;
use crate::utils::code_generator::CodeGenerator;
use crate::utils::url_validator::validate_destination;

/// Unvalidated input for a new short link.
#[derive(Debug, Clone, Default)]
pub struct CreateLink {
    pub long_url: String,
    pub custom_slug: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub utm_params: Option<TrackingParams>,
}

impl CreateLink {
    pub fn new(long_url: impl Into<String>) -> Self {
        Self {
            long_url: long_url.into(),
            ..Default::default()
        }
    }
}

/// Service for creating, reading and deleting short links.
///
/// All validation and code allocation happen before the insert, so a failed
/// request never leaves a partial record behind.
pub struct LinkService<L: LinkRepository + ?Sized = dyn LinkRepository> {
    repository: Arc<L>,
    allocator: CodeAllocator<L>,
    cache: Arc<ResolutionCache>,
    clock: Arc<dyn Clock>,
    base_url: String,
    store_timeout: Duration,
}

impl<L: LinkRepository + ?Sized> LinkService<L> {
    pub fn new(
        repository: Arc<L>,
        cache: Arc<ResolutionCache>,
        clock: Arc<dyn Clock>,
        settings: &ServiceSettings,
    ) -> Self {
        let allocator = CodeAllocator::new(
            repository.clone(),
            CodeGenerator::new(settings.code_length),
            settings.max_generation_attempts,
            settings.store_timeout,
        );

        Self {
            repository,
            allocator,
            cache,
            clock,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            store_timeout: settings.store_timeout,
        }
    }

    /// Creates a short link.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for a bad destination, a non-future
    ///   expiration or a malformed slug
    /// - [`AppError::Conflict`] if the custom slug is taken
    /// - [`AppError::Internal`] if no free code was found or the store failed
    pub async fn create_short_link(&self, request: CreateLink) -> Result<Link, AppError> {
        let draft = self.validate(request)?;
        let link = self.allocator.insert_unique(&draft).await?;

        metrics::counter!("links_created_total").increment(1);
        info!(
            id = link.id,
            code = %link.code,
            custom = link.custom_slug.is_some(),
            "Short link created"
        );

        Ok(link)
    }

    /// Retrieves a link by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this id.
    pub async fn get_link(&self, id: i64) -> Result<Link, AppError> {
        bounded(self.store_timeout, "find_by_id", self.repository.find_by_id(id))
            .await?
            .ok_or_else(|| AppError::link_not_found(json!({ "id": id })))
    }

    /// Deletes a link and evicts its code from the resolution cache.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this id.
    pub async fn delete_link(&self, id: i64) -> Result<(), AppError> {
        let link = self.get_link(id).await?;

        let deleted = bounded(self.store_timeout, "delete", self.repository.delete(id)).await?;
        // Invalidate even if a concurrent delete won, the code is gone either way.
        self.cache.invalidate(&link.code);

        if !deleted {
            return Err(AppError::link_not_found(json!({ "id": id })));
        }

        info!(id, code = %link.code, "Short link deleted");
        Ok(())
    }

    /// Renders the public short URL for `code`.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url, code)
    }

    pub fn is_expired(&self, link: &Link) -> bool {
        link.is_expired_at(self.clock.now())
    }

    /// Checks that the record store answers.
    pub async fn check_store(&self) -> Result<(), AppError> {
        bounded(self.store_timeout, "ping", self.repository.ping()).await
    }

    fn validate(&self, request: CreateLink) -> Result<LinkDraft, AppError> {
        // Stored in parsed form: the parser strips tabs and newlines, which
        // could not be sent back in a Location header.
        let destination = validate_destination(&request.long_url).map_err(|e| {
            warn!(reason = %e, "Rejected destination URL");
            AppError::invalid_destination(e.to_string())
        })?;

        if let Some(expires_at) = request.expires_at
            && expires_at <= self.clock.now()
        {
            warn!(%expires_at, "Rejected expiration in the past");
            return Err(AppError::invalid_expiration(expires_at));
        }

        if let Some(params) = &request.utm_params
            && params.len() > MAX_TRACKING_PARAMS
        {
            return Err(AppError::bad_request(
                "Too many tracking parameters",
                json!({ "count": params.len(), "max": MAX_TRACKING_PARAMS }),
            ));
        }

        let custom_slug = request
            .custom_slug
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(LinkDraft {
            long_url: destination.into(),
            custom_slug,
            expires_at: request.expires_at,
            utm_params: request.utm_params.filter(|p| !p.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::redirect::ResolvedLink;
    use crate::domain::repositories::{InsertOutcome, MockLinkRepository};
    use crate::utils::clock::ManualClock;
    use chrono::TimeDelta;
    use mockall::predicate::eq;

    fn service_with(repo: MockLinkRepository) -> (LinkService<MockLinkRepository>, Arc<ResolutionCache>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(ResolutionCache::new(Duration::from_secs(300), clock.clone()));
        let settings = ServiceSettings {
            base_url: "https://s.example.com/".to_string(),
            ..ServiceSettings::default()
        };
        let service = LinkService::new(Arc::new(repo), cache.clone(), clock.clone(), &settings);
        (service, cache, clock)
    }

    fn stored(id: i64, code: &str) -> Link {
        Link {
            id,
            code: code.to_string(),
            long_url: "https://example.com".to_string(),
            custom_slug: None,
            expires_at: None,
            utm_params: None,
            click_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_short_link_success() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists_by_code().times(1).returning(|_| Ok(false));
        repo.expect_insert()
            .withf(|l| l.long_url == "https://example.com/page" && l.code.len() == 8)
            .times(1)
            .returning(|l| Ok(InsertOutcome::Inserted(l.into_link(10, Utc::now()))));

        let (service, _, _) = service_with(repo);
        let link = service
            .create_short_link(CreateLink::new("  https://example.com/page "))
            .await
            .unwrap();

        assert_eq!(link.id, 10);
        assert_eq!(service.short_url(&link.code), format!("https://s.example.com/{}", link.code));
    }

    #[tokio::test]
    async fn test_create_short_link_stores_parsed_destination() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists_by_code().returning(|_| Ok(false));
        repo.expect_insert()
            .withf(|l| l.long_url == "https://example.com/ab")
            .times(1)
            .returning(|l| Ok(InsertOutcome::Inserted(l.into_link(1, Utc::now()))));

        let (service, _, _) = service_with(repo);
        let link = service
            .create_short_link(CreateLink::new("https://example.com/a\n\tb"))
            .await
            .unwrap();

        assert_eq!(link.long_url, "https://example.com/ab");
    }

    #[tokio::test]
    async fn test_create_short_link_invalid_url() {
        let mut repo = MockLinkRepository::new();
        repo.expect_insert().times(0);

        let (service, _, _) = service_with(repo);
        let err = service
            .create_short_link(CreateLink::new("ftp://example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(err.to_error_info().message, "Invalid destination URL");
    }

    #[tokio::test]
    async fn test_create_short_link_past_expiration() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists_by_code().times(0);
        repo.expect_insert().times(0);

        let (service, _, clock) = service_with(repo);
        let request = CreateLink {
            expires_at: Some(clock.now()),
            ..CreateLink::new("https://example.com")
        };

        let err = service.create_short_link(request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(err.to_error_info().message, "Expiration must be in the future");
    }

    #[tokio::test]
    async fn test_create_short_link_custom_slug_taken() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists_by_code()
            .with(eq("promo"))
            .returning(|_| Ok(true));
        repo.expect_insert().times(0);

        let (service, _, _) = service_with(repo);
        let request = CreateLink {
            custom_slug: Some("promo".to_string()),
            ..CreateLink::new("https://example.com")
        };

        let err = service.create_short_link(request).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_empty_slug_and_params_are_ignored() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists_by_code().returning(|_| Ok(false));
        repo.expect_insert()
            .withf(|l| l.custom_slug.is_none() && l.utm_params.is_none())
            .times(1)
            .returning(|l| Ok(InsertOutcome::Inserted(l.into_link(1, Utc::now()))));

        let (service, _, _) = service_with(repo);
        let request = CreateLink {
            custom_slug: Some("  ".to_string()),
            utm_params: Some(TrackingParams::new()),
            ..CreateLink::new("https://example.com")
        };

        assert!(service.create_short_link(request).await.is_ok());
    }

    #[tokio::test]
    async fn test_too_many_tracking_params_rejected() {
        let mut repo = MockLinkRepository::new();
        repo.expect_insert().times(0);

        let (service, _, _) = service_with(repo);
        let request = CreateLink {
            utm_params: Some((0..=MAX_TRACKING_PARAMS).map(|i| (format!("p{i}"), "v")).collect()),
            ..CreateLink::new("https://example.com")
        };

        let err = service.create_short_link(request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_get_link_not_found() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id().with(eq(7)).returning(|_| Ok(None));

        let (service, _, _) = service_with(repo);
        let err = service.get_link(7).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_link_evicts_cache() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id()
            .with(eq(3))
            .returning(|id| Ok(Some(stored(id, "abc"))));
        repo.expect_delete().with(eq(3)).times(1).returning(|_| Ok(true));

        let (service, cache, _) = service_with(repo);
        cache.insert("abc", ResolvedLink::from(&stored(3, "abc")));

        service.delete_link(3).await.unwrap();

        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_link() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));
        repo.expect_delete().times(0);

        let (service, _, _) = service_with(repo);
        let err = service.delete_link(99).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_is_expired_follows_clock() {
        let (service, _, clock) = service_with(MockLinkRepository::new());
        let mut link = stored(1, "abc");
        link.expires_at = Some(clock.now() + TimeDelta::seconds(10));

        assert!(!service.is_expired(&link));
        clock.advance(TimeDelta::seconds(10));
        assert!(service.is_expired(&link));
    }
}
