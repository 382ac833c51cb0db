//! Short code generation and custom slug validation.
//!
//! Generated codes are drawn uniformly, with replacement, from a 62-symbol
//! alphanumeric alphabet. Custom slugs share the same namespace but may use a
//! slightly wider character set.

use crate::error::AppError;
use rand::Rng;
use serde_json::json;

/// Alphabet for generated codes: lower-case, upper-case, digits.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default length of generated codes.
pub const DEFAULT_CODE_LENGTH: usize = 8;

/// Bounds on custom slug length.
pub const SLUG_MIN_LENGTH: usize = 3;
pub const SLUG_MAX_LENGTH: usize = 50;

/// Codes that would shadow service routes.
const RESERVED_CODES: &[&str] = &["api", "health"];

/// Stateless generator of fixed-length random codes.
///
/// Uses the thread-local RNG; codes are not meant to be unguessable, only
/// evenly spread across the alphabet.
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    length: usize,
}

impl CodeGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Produces a new candidate code.
    pub fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..self.length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

/// Generates a code of [`DEFAULT_CODE_LENGTH`].
pub fn generate_code() -> String {
    CodeGenerator::default().generate()
}

/// Validates a user-provided custom slug.
///
/// # Rules
///
/// - Length: 3-50 characters
/// - Allowed characters: ASCII letters, digits, `-` and `_`
/// - Cannot be a reserved route segment
///
/// # Errors
///
/// Returns [`AppError::Validation`] if any rule is violated.
pub fn validate_custom_slug(slug: &str) -> Result<(), AppError> {
    if slug.len() < SLUG_MIN_LENGTH || slug.len() > SLUG_MAX_LENGTH {
        return Err(AppError::bad_request(
            format!(
                "Custom slug must be {}-{} characters",
                SLUG_MIN_LENGTH, SLUG_MAX_LENGTH
            ),
            json!({ "provided_length": slug.len() }),
        ));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::bad_request(
            "Custom slug can only contain letters, digits, hyphens and underscores",
            json!({ "slug": slug }),
        ));
    }

    if RESERVED_CODES.iter().any(|r| r.eq_ignore_ascii_case(slug)) {
        return Err(AppError::bad_request(
            "This slug is reserved",
            json!({ "slug": slug }),
        ));
    }

    Ok(())
}
