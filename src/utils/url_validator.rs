//! Destination URL validation.

use url::Url;

/// Reasons a destination URL is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("URL is empty")]
    Empty,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL must include a host")]
    MissingHost,
}

/// Checks that `input` is an absolute HTTP(S) URL with a host.
///
/// Returns the parsed [`Url`]. Its serialization is the form to store: the
/// parser drops ASCII tabs and newlines and percent-encodes what a header
/// value cannot carry.
///
/// # Errors
///
/// Rejects empty input, unparseable or relative URLs, non-HTTP(S) schemes
/// (`javascript:`, `data:`, `file:` ...) and URLs without a host.
pub fn validate_destination(input: &str) -> Result<Url, UrlValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlValidationError::Empty);
    }

    let url =
        Url::parse(trimmed).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlValidationError::UnsupportedProtocol),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}
