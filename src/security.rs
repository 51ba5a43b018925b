// this_file: src/security.rs
//! Input limits for quotes, fonts, source images and batch specs

use crate::error::{Error, Result};
use camino::{Utf8Component, Utf8Path};
use log::warn;

/// Maximum allowed JSON input size for batch specs and config files (10MB)
pub const MAX_JSON_SIZE: usize = 10 * 1024 * 1024;

/// Maximum allowed number of jobs in a single batch spec
pub const MAX_JOBS_PER_SPEC: usize = 1000;

/// Maximum quote length in bytes
pub const MAX_QUOTE_LENGTH: usize = 10_000;

/// Maximum author length in bytes
pub const MAX_AUTHOR_LENGTH: usize = 200;

/// Maximum allowed font file size (50MB)
pub const MAX_FONT_SIZE: u64 = 50 * 1024 * 1024;

/// Maximum size of a downloaded or local source photo (25MB)
pub const MAX_SOURCE_IMAGE_BYTES: u64 = 25 * 1024 * 1024;

/// Validate JSON input size
pub fn validate_json_size(json: &str) -> Result<()> {
    if json.len() > MAX_JSON_SIZE {
        return Err(Error::InvalidParameter(format!(
            "JSON input too large: {} bytes (max: {} bytes)",
            json.len(),
            MAX_JSON_SIZE
        )));
    }
    Ok(())
}

/// Validate the job count of a batch spec
pub fn validate_job_count(count: usize) -> Result<()> {
    if count > MAX_JOBS_PER_SPEC {
        return Err(Error::InvalidParameter(format!(
            "Too many jobs: {} (max: {})",
            count, MAX_JOBS_PER_SPEC
        )));
    }
    Ok(())
}

/// Validate quote and author text before layout.
///
/// Whitespace control characters (newline, tab) are allowed; the wrapper
/// collapses them like spaces.
pub fn validate_quote_input(text: &str, author: &str) -> Result<()> {
    check_text("Quote", text, MAX_QUOTE_LENGTH)?;
    check_text("Author", author, MAX_AUTHOR_LENGTH)
}

fn check_text(what: &str, text: &str, max: usize) -> Result<()> {
    if text.len() > max {
        return Err(Error::InvalidParameter(format!(
            "{} too long: {} bytes (max: {} bytes)",
            what,
            text.len(),
            max
        )));
    }
    if text.chars().any(|c| c.is_control() && !c.is_whitespace()) {
        warn!("{} rejected: contains control characters", what);
        return Err(Error::InvalidParameter(format!(
            "{} contains invalid control characters",
            what
        )));
    }
    Ok(())
}

/// Validate font file size
pub fn validate_font_size(size: u64) -> Result<()> {
    if size > MAX_FONT_SIZE {
        return Err(Error::Font(format!(
            "Font file too large: {} bytes (max: {} bytes)",
            size, MAX_FONT_SIZE
        )));
    }
    Ok(())
}

/// Validate source image size
pub fn validate_source_size(size: u64) -> Result<()> {
    if size > MAX_SOURCE_IMAGE_BYTES {
        return Err(Error::Acquisition(format!(
            "Source image too large: {} bytes (max: {} bytes)",
            size, MAX_SOURCE_IMAGE_BYTES
        )));
    }
    Ok(())
}

/// Reject output paths that are absolute or climb out of the output directory
pub fn validate_relative_path(path: &Utf8Path) -> Result<()> {
    let escapes = path
        .components()
        .any(|c| !matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir));
    if path.as_str().is_empty() || escapes {
        warn!("Rejected output path: {}", path);
        return Err(Error::InvalidParameter(format!(
            "Output path must be relative and stay inside the output directory: {:?}",
            path.as_str()
        )));
    }
    Ok(())
}
