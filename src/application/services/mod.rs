//! Business logic services for the application layer.

pub mod code_allocator;
pub mod link_service;
pub mod redirect_service;
mod store_timeout;

pub use code_allocator::CodeAllocator;
pub use link_service::LinkService;
pub use redirect_service::RedirectService;

use std::time::Duration;

use crate::utils::code_generator::DEFAULT_CODE_LENGTH;

/// Tunables shared by the services.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Public base URL used to render short links, without trailing slash.
    pub base_url: String,
    pub code_length: usize,
    /// Upper bound on candidate codes tried per allocation.
    pub max_generation_attempts: usize,
    /// Upper bound on a single record store call on the request path.
    pub store_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            code_length: DEFAULT_CODE_LENGTH,
            max_generation_attempts: 10,
            store_timeout: Duration::from_secs(5),
        }
    }
}
