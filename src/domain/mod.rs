//! Domain layer: entities, repository contracts and redirect logic.
//!
//! # Architecture
//!
//! - [`entities`] - Core data structures
//! - [`repositories`] - Data access trait definitions
//! - [`redirect`] - Expiration check and target composition
//! - [`click_event`] - Click event model and non-blocking recorder
//! - [`click_worker`] - Asynchronous click persistence worker
//!
//! # Click Processing Flow
//!
//! 1. The redirect service resolves a code to a non-expired link
//! 2. A [`click_event::ClickEvent`] is offered to the bounded queue (never waits)
//! 3. [`click_worker::run_click_worker`] increments the counter with retries
//! 4. Failures are logged and the click is dropped

pub mod click_event;
pub mod click_worker;
pub mod entities;
pub mod redirect;
pub mod repositories;
