//! Repository trait definitions for the domain layer.
//!
//! The core only talks to durable storage through these traits. Concrete
//! implementations live in `crate::infrastructure::persistence`; mock
//! implementations are generated with `mockall` for unit tests.

pub mod link_repository;

pub use link_repository::{InsertOutcome, LinkRepository};

#[cfg(test)]
pub use link_repository::MockLinkRepository;
