//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::application::services::{LinkService, RedirectService, ServiceSettings};
use crate::domain::click_event::ClickRecorder;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::ResolutionCache;
use crate::utils::clock::Clock;

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub redirect_service: Arc<RedirectService>,
    pub cache: Arc<ResolutionCache>,
    pub click_recorder: ClickRecorder,
}

impl AppState {
    /// Wires the services over one record store, cache and clock.
    pub fn new(
        repository: Arc<dyn LinkRepository>,
        cache: Arc<ResolutionCache>,
        clock: Arc<dyn Clock>,
        click_recorder: ClickRecorder,
        settings: &ServiceSettings,
    ) -> Self {
        let link_service = Arc::new(LinkService::new(
            repository.clone(),
            cache.clone(),
            clock.clone(),
            settings,
        ));

        let redirect_service = Arc::new(RedirectService::new(
            repository,
            cache.clone(),
            clock,
            click_recorder.clone(),
            settings.store_timeout,
        ));

        Self {
            link_service,
            redirect_service,
            cache,
            click_recorder,
        }
    }
}
