//! Application layer services implementing business logic.
//!
//! Services coordinate repository calls, validation and the resolution cache,
//! and expose a small API to HTTP handlers and the admin CLI.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Short link creation, lookup and deletion
//! - [`services::code_allocator::CodeAllocator`] - Collision-free code allocation
//! - [`services::redirect_service::RedirectService`] - Code resolution for redirects

pub mod services;
