//! Text validation
//!
//! Runs before any classification work and is identical for both classifier
//! paths. Pure, no I/O.

use crate::error::ValidationError;

/// Minimum number of characters after trimming
pub const MIN_TEXT_CHARS: usize = 3;

/// Maximum number of characters after trimming
pub const MAX_TEXT_CHARS: usize = 5000;

/// Maximum number of line breaks in a single text
pub const MAX_LINE_BREAKS: usize = 50;

/// Minimum share of alphanumeric or whitespace characters
pub const MIN_TEXTUAL_RATIO: f32 = 0.5;

/// Validate a single text.
///
/// Lengths are counted in Unicode scalar values on the whitespace-trimmed
/// text. Checks run in the order too short, too long, invalid content, and
/// the first failure is returned.
pub fn validate(text: &str) -> std::result::Result<(), ValidationError> {
    let trimmed = text.trim();
    let char_count = trimmed.chars().count();

    if char_count < MIN_TEXT_CHARS {
        return Err(ValidationError::TooShort);
    }

    if char_count > MAX_TEXT_CHARS {
        return Err(ValidationError::TooLong);
    }

    if !is_safe_content(trimmed, char_count) {
        return Err(ValidationError::InvalidContent);
    }

    Ok(())
}

fn is_safe_content(text: &str, char_count: usize) -> bool {
    let mut line_breaks = 0usize;
    let mut textual = 0usize;

    for c in text.chars() {
        if c == '\n' {
            line_breaks += 1;
        }

        if c == char::REPLACEMENT_CHARACTER {
            return false;
        }

        if c.is_control() && !matches!(c, '\n' | '\r' | '\t') {
            return false;
        }

        if c.is_alphanumeric() || c.is_whitespace() {
            textual += 1;
        }
    }

    if line_breaks > MAX_LINE_BREAKS {
        return false;
    }

    (textual as f32 / char_count as f32) >= MIN_TEXTUAL_RATIO
}
