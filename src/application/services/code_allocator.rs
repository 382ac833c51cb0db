//! Collision-free short code allocation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::store_timeout::bounded;
use crate::domain::entities::{Link, LinkDraft};
use crate::domain::repositories::{InsertOutcome, LinkRepository};
use crate::error::AppError;
use crate::utils::code_generator::{CodeGenerator, validate_custom_slug};

/// Picks a code that is not yet used by any record and inserts the link
/// under it.
///
/// Generated candidates are checked against the store first. Because another
/// request may claim the same code between that check and the insert, the
/// insert itself is conditional and a lost race counts as one more collision.
/// Both kinds of collision share the same attempt budget.
pub struct CodeAllocator<L: LinkRepository + ?Sized = dyn LinkRepository> {
    repository: Arc<L>,
    generator: CodeGenerator,
    max_attempts: usize,
    store_timeout: Duration,
}

impl<L: LinkRepository + ?Sized> CodeAllocator<L> {
    pub fn new(
        repository: Arc<L>,
        generator: CodeGenerator,
        max_attempts: usize,
        store_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            generator,
            max_attempts: max_attempts.max(1),
            store_timeout,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Returns a code that was free at the time of the check.
    ///
    /// With `custom_slug` the slug itself is validated and returned if no
    /// record uses it. Without one, up to `max_attempts` random candidates
    /// are tried.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] if the slug is malformed or reserved
    /// - [`AppError::Conflict`] if the slug is already used
    /// - [`AppError::Internal`] when every generated candidate collided
    pub async fn allocate(&self, custom_slug: Option<&str>) -> Result<String, AppError> {
        self.allocate_after(custom_slug, 0).await.map(|(code, _)| code)
    }

    /// Allocates a code for `draft` and inserts the record.
    ///
    /// A custom slug that loses the insert race is reported as taken; a
    /// generated code that loses it is retried with a fresh candidate.
    pub async fn insert_unique(&self, draft: &LinkDraft) -> Result<Link, AppError> {
        let slug = draft.custom_slug.as_deref();
        let mut used = 0;

        loop {
            let (code, attempt) = self.allocate_after(slug, used).await?;

            match self.try_insert(draft, code).await? {
                InsertOutcome::Inserted(link) => return Ok(link),
                InsertOutcome::CodeTaken => match slug {
                    Some(slug) => {
                        warn!(slug, "Custom slug claimed concurrently");
                        return Err(AppError::slug_taken(slug));
                    }
                    None => {
                        debug!(attempt, "Generated code claimed concurrently, retrying");
                        used = attempt;
                    }
                },
            }
        }
    }

    /// Like [`Self::allocate`], but with `used` attempts already spent.
    /// Returns the code and the attempt number that produced it.
    async fn allocate_after(
        &self,
        custom_slug: Option<&str>,
        used: usize,
    ) -> Result<(String, usize), AppError> {
        if let Some(slug) = custom_slug {
            return Ok((self.claim_slug(slug).await?, used));
        }

        for attempt in used + 1..=self.max_attempts {
            if let Some(code) = self.free_candidate(attempt).await? {
                return Ok((code, attempt));
            }
        }

        Err(self.exhausted())
    }

    async fn claim_slug(&self, slug: &str) -> Result<String, AppError> {
        validate_custom_slug(slug)?;

        if self.exists(slug).await? {
            warn!(slug, "Custom slug already taken");
            return Err(AppError::slug_taken(slug));
        }

        Ok(slug.to_string())
    }

    /// Generates one candidate; `None` if it is already in use.
    async fn free_candidate(&self, attempt: usize) -> Result<Option<String>, AppError> {
        let code = self.generator.generate();

        if self.exists(&code).await? {
            debug!(attempt, "Generated code collided");
            return Ok(None);
        }

        Ok(Some(code))
    }

    async fn exists(&self, code: &str) -> Result<bool, AppError> {
        bounded(
            self.store_timeout,
            "exists_by_code",
            self.repository.exists_by_code(code),
        )
        .await
    }

    async fn try_insert(&self, draft: &LinkDraft, code: String) -> Result<InsertOutcome, AppError> {
        bounded(
            self.store_timeout,
            "insert",
            self.repository.insert(draft.with_code(code)),
        )
        .await
    }

    fn exhausted(&self) -> AppError {
        error!(
            attempts = self.max_attempts,
            code_length = self.generator.length(),
            "Short code generation exhausted"
        );
        AppError::generation_exhausted(self.max_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::NewLink;
    use crate::domain::repositories::MockLinkRepository;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn allocator(repo: MockLinkRepository, attempts: usize) -> CodeAllocator<MockLinkRepository> {
        CodeAllocator::new(
            Arc::new(repo),
            CodeGenerator::new(8),
            attempts,
            Duration::from_secs(1),
        )
    }

    fn inserted(new_link: NewLink) -> InsertOutcome {
        InsertOutcome::Inserted(new_link.into_link(1, Utc::now()))
    }

    #[tokio::test]
    async fn test_allocate_returns_first_free_code() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists_by_code().times(1).returning(|_| Ok(false));

        let code = allocator(repo, 10).allocate(None).await.unwrap();

        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn test_allocate_retries_on_collision() {
        let mut repo = MockLinkRepository::new();
        let mut seq = mockall::Sequence::new();
        repo.expect_exists_by_code()
            .times(3)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        repo.expect_exists_by_code()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));

        assert!(allocator(repo, 10).allocate(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_allocate_exhausted_after_budget() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists_by_code().times(5).returning(|_| Ok(true));

        let err = allocator(repo, 5).allocate(None).await.unwrap_err();

        assert!(matches!(err, AppError::Internal { .. }));
        assert_eq!(err.to_error_info().details["attempts"], 5);
    }

    #[tokio::test]
    async fn test_allocate_free_custom_slug() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists_by_code()
            .with(eq("promo"))
            .times(1)
            .returning(|_| Ok(false));

        assert_eq!(allocator(repo, 10).allocate(Some("promo")).await.unwrap(), "promo");
    }

    #[tokio::test]
    async fn test_allocate_taken_custom_slug() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists_by_code().returning(|_| Ok(true));

        let err = allocator(repo, 10).allocate(Some("promo")).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_allocate_invalid_slug_skips_store() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists_by_code().times(0);

        let err = allocator(repo, 10).allocate(Some("a b")).await.unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_insert_unique_retries_lost_race() {
        let mut repo = MockLinkRepository::new();
        let mut seq = mockall::Sequence::new();
        repo.expect_exists_by_code().returning(|_| Ok(false));
        repo.expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(InsertOutcome::CodeTaken));
        repo.expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|new_link| Ok(inserted(new_link)));

        let link = allocator(repo, 10)
            .insert_unique(&LinkDraft::new("https://example.com"))
            .await
            .unwrap();

        assert_eq!(link.code.len(), 8);
        assert_eq!(link.custom_slug, None);
    }

    #[tokio::test]
    async fn test_insert_unique_slug_lost_race_is_conflict() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists_by_code().returning(|_| Ok(false));
        repo.expect_insert()
            .times(1)
            .returning(|_| Ok(InsertOutcome::CodeTaken));

        let mut draft = LinkDraft::new("https://example.com");
        draft.custom_slug = Some("promo".to_string());

        let err = allocator(repo, 10).insert_unique(&draft).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_insert_unique_with_slug_stores_slug_as_code() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists_by_code().returning(|_| Ok(false));
        repo.expect_insert()
            .withf(|l| l.code == "promo" && l.custom_slug.as_deref() == Some("promo"))
            .times(1)
            .returning(|new_link| Ok(inserted(new_link)));

        let mut draft = LinkDraft::new("https://example.com");
        draft.custom_slug = Some("promo".to_string());

        let link = allocator(repo, 10).insert_unique(&draft).await.unwrap();
        assert_eq!(link.code, "promo");
    }

    #[tokio::test]
    async fn test_insert_unique_shares_budget_between_collision_kinds() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists_by_code().times(4).returning(|_| Ok(false));
        repo.expect_insert()
            .times(4)
            .returning(|_| Ok(InsertOutcome::CodeTaken));

        let err = allocator(repo, 4)
            .insert_unique(&LinkDraft::new("https://example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_insert_unique_continues_budget_after_lost_race() {
        let mut repo = MockLinkRepository::new();
        let mut seq = mockall::Sequence::new();
        repo.expect_exists_by_code()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        repo.expect_exists_by_code()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));
        repo.expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(InsertOutcome::CodeTaken));
        repo.expect_exists_by_code()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));

        let err = allocator(repo, 3)
            .insert_unique(&LinkDraft::new("https://example.com"))
            .await
            .unwrap_err();

        assert_eq!(err.to_error_info().details["attempts"], 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_times_out() {
        struct Slow;

        #[async_trait::async_trait]
        impl LinkRepository for Slow {
            async fn insert(&self, _: NewLink) -> Result<InsertOutcome, AppError> {
                unreachable!()
            }
            async fn find_by_code(&self, _: &str) -> Result<Option<Link>, AppError> {
                unreachable!()
            }
            async fn find_by_id(&self, _: i64) -> Result<Option<Link>, AppError> {
                unreachable!()
            }
            async fn exists_by_code(&self, _: &str) -> Result<bool, AppError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(false)
            }
            async fn increment_clicks(&self, _: i64) -> Result<(), AppError> {
                unreachable!()
            }
            async fn delete(&self, _: i64) -> Result<bool, AppError> {
                unreachable!()
            }
            async fn ping(&self) -> Result<(), AppError> {
                Ok(())
            }
        }

        let allocator = CodeAllocator::new(
            Arc::new(Slow),
            CodeGenerator::default(),
            3,
            Duration::from_millis(100),
        );

        let err = allocator.allocate(None).await.unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));
        assert_eq!(err.to_error_info().message, "Record store timed out");
    }
}
