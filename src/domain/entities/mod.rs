//! Core domain entities.
//!
//! - [`Link`] - A stored short link record
//! - [`NewLink`] - Insert payload with an allocated code
//! - [`LinkDraft`] - Validated creation input awaiting a code
//! - [`TrackingParams`] - Ordered tracking parameters appended on redirect

pub mod link;
pub mod tracking;

pub use link::{Link, LinkDraft, NewLink};
pub use tracking::TrackingParams;
