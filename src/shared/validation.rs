use lazy_static::lazy_static;
use regex::Regex;
use validator::Validate;

use crate::core::error::{AppError, Result};

lazy_static! {
    /// Runs of characters that are not ASCII letters or digits.
    /// Collapsed to a single separator when deriving storage folder names.
    pub static ref NON_ALPHANUMERIC_RUN: Regex = Regex::new(r"[^a-zA-Z0-9]+").unwrap();

    /// Characters kept verbatim in staged file names
    pub static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9._-]+").unwrap();
}

/// Separator used between words of a folder segment
pub const FOLDER_SEPARATOR: &str = "_";

/// Normalize one folder segment: lowercase, non-alphanumeric runs become `_`,
/// no leading or trailing separator. Empty input yields "general".
pub fn normalize_folder_segment(raw: &str) -> String {
    let replaced = NON_ALPHANUMERIC_RUN.replace_all(raw.trim(), FOLDER_SEPARATOR);
    let trimmed = replaced.trim_matches('_').to_lowercase();

    if trimmed.is_empty() {
        "general".to_string()
    } else {
        trimmed
    }
}

/// Make an uploaded file name safe to use inside the staging directory
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Run `validator` rules on a parsed input, mapping failures to `AppError::Validation`
pub fn validated<T: Validate>(value: T) -> Result<T> {
    value
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(value)
}
