//! Utility functions shared across layers.
//!
//! - [`code_generator`] - Short code generation and custom slug validation
//! - [`url_validator`] - Destination URL validation
//! - [`clock`] - Injectable time source

pub mod clock;
pub mod code_generator;
pub mod url_validator;
