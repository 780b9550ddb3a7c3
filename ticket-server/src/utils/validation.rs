//! Input validation helpers
//!
//! Centralized text length limits for board, status and ticket payloads.
//! Lengths are counted in characters, not bytes.

use shared::error::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Board, status and ticket titles
pub const MIN_TITLE_LEN: usize = 3;
pub const MAX_TITLE_LEN: usize = 100;

/// Status titles are column headers
pub const MAX_STATUS_TITLE_LEN: usize = 50;

/// Ticket descriptions
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Ticket contact (phone, email, name)
pub const MAX_CONTACT_LEN: usize = 100;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limits.
pub fn validate_required_text(
    value: &str,
    field: &str,
    min_len: usize,
    max_len: usize,
) -> Result<(), AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    let len = trimmed.chars().count();
    if len < min_len {
        return Err(AppError::validation(format!(
            "{field} is too short ({len} chars, min {min_len})"
        )));
    }
    if len > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({len} chars, max {max_len})"
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: Option<&str>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.chars().count() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.chars().count()
        )));
    }
    Ok(())
}

/// Validate a board or ticket title and return it trimmed.
pub fn title(value: &str) -> Result<String, AppError> {
    validate_required_text(value, "title", MIN_TITLE_LEN, MAX_TITLE_LEN)?;
    Ok(value.trim().to_string())
}

/// Validate a status title and return it trimmed.
pub fn status_title(value: &str) -> Result<String, AppError> {
    validate_required_text(value, "title", MIN_TITLE_LEN, MAX_STATUS_TITLE_LEN)?;
    Ok(value.trim().to_string())
}
