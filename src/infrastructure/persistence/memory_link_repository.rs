//! Process-local link repository.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::{InsertOutcome, LinkRepository};
use crate::error::AppError;

/// In-memory implementation of [`LinkRepository`].
///
/// Records are keyed by code, so the insert check-and-set happens under the
/// shard lock of that code and two concurrent inserts of the same code
/// cannot both succeed. A secondary index maps ids to codes.
#[derive(Debug)]
pub struct InMemoryLinkRepository {
    by_code: DashMap<String, Link>,
    code_by_id: DashMap<i64, String>,
    next_id: AtomicI64,
}

impl InMemoryLinkRepository {
    pub fn new() -> Self {
        Self {
            by_code: DashMap::new(),
            code_by_id: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

impl Default for InMemoryLinkRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkRepository for InMemoryLinkRepository {
    async fn insert(&self, new_link: NewLink) -> Result<InsertOutcome, AppError> {
        match self.by_code.entry(new_link.code.clone()) {
            Entry::Occupied(_) => Ok(InsertOutcome::CodeTaken),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let link = new_link.into_link(id, Utc::now());
                self.code_by_id.insert(id, link.code.clone());
                slot.insert(link.clone());
                Ok(InsertOutcome::Inserted(link))
            }
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        Ok(self.by_code.get(code).map(|l| l.clone()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        let Some(code) = self.code_by_id.get(&id).map(|c| c.clone()) else {
            return Ok(None);
        };
        Ok(self.by_code.get(&code).map(|l| l.clone()))
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.by_code.contains_key(code))
    }

    async fn increment_clicks(&self, id: i64) -> Result<(), AppError> {
        let Some(code) = self.code_by_id.get(&id).map(|c| c.clone()) else {
            return Ok(());
        };
        if let Some(mut link) = self.by_code.get_mut(&code) {
            link.click_count += 1;
            link.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        match self.code_by_id.remove(&id) {
            Some((_, code)) => Ok(self.by_code.remove(&code).is_some()),
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
