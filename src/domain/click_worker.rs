//! Background worker that persists click increments.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info};

use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::LinkRepository;

/// Retries after the first failed increment.
const MAX_RETRIES: usize = 3;

/// Drains the click queue until every sender is dropped.
///
/// Up to `concurrency` increments run at once. Each increment is retried with
/// exponential backoff; a click that still fails is logged and dropped.
/// Panics inside an increment task are caught and logged as well.
pub async fn run_click_worker<R>(
    mut rx: mpsc::Receiver<ClickEvent>,
    repository: Arc<R>,
    concurrency: usize,
) where
    R: LinkRepository + ?Sized + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    while let Some(event) = rx.recv().await {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };

        let repository = repository.clone();
        tasks.spawn(async move {
            let _permit = permit;
            persist_click(repository.as_ref(), &event).await;
        });

        while let Some(result) = tasks.try_join_next() {
            log_join_result(result);
        }
    }

    while let Some(result) = tasks.join_next().await {
        log_join_result(result);
    }

    info!("Click worker stopped");
}

/// Increments the counter for one click, retrying transient failures.
///
/// Returns whether the increment was eventually persisted.
pub async fn persist_click<R>(repository: &R, event: &ClickEvent) -> bool
where
    R: LinkRepository + ?Sized,
{
    // 20ms, 40ms, 80ms before jitter.
    let strategy = ExponentialBackoff::from_millis(2)
        .factor(10)
        .map(jitter)
        .take(MAX_RETRIES);

    match Retry::start(strategy, || repository.increment_clicks(event.link_id)).await {
        Ok(()) => {
            debug!(code = %event.code, link_id = event.link_id, "Click recorded");
            true
        }
        Err(e) => {
            metrics::counter!("clicks_failed_total").increment(1);
            error!(
                code = %event.code,
                link_id = event.link_id,
                error = %e,
                "Failed to increment click count, dropping click"
            );
            false
        }
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!("Click task failed: {}", e);
    }
}
