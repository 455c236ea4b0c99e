//! Input filtering for entity fields and filter parameters.
//!
//! These run before any query construction so malformed input never reaches
//! the storage layer.

use crate::error::CoreError;
use crate::types::DbId;

/// Maximum body size in bytes. Generous; a report of a few million
/// characters is still accepted.
pub const MAX_BODY_SIZE: usize = 4_120_000;

/// Sanitize a title: strip line breaks, fall back to "Untitled" when empty.
pub fn title(input: &str) -> String {
    let cleaned = input
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string();
    if cleaned.is_empty() {
        return "Untitled".to_string();
    }
    cleaned
}

/// Validate a `YYYYMMDD` date string. Anything missing or malformed falls
/// back to today's date.
pub fn kdate(input: Option<&str>) -> String {
    if let Some(raw) = input {
        if chrono::NaiveDate::parse_from_str(raw, "%Y%m%d").is_ok() {
            return raw.to_string();
        }
    }
    chrono::Utc::now().format("%Y%m%d").to_string()
}

/// Validate a body against the size cap.
pub fn body(input: &str) -> Result<&str, CoreError> {
    if input.len() > MAX_BODY_SIZE {
        return Err(CoreError::Validation(format!(
            "Body exceeds maximum size of {MAX_BODY_SIZE} bytes"
        )));
    }
    Ok(input)
}

/// Reject non-positive ids before they reach a query.
pub fn check_id(id: DbId) -> Result<DbId, CoreError> {
    if id <= 0 {
        return Err(CoreError::Validation(format!("Invalid id: {id}")));
    }
    Ok(id)
}

/// Reject ratings outside 0..=5.
pub fn check_rating(rating: i16) -> Result<i16, CoreError> {
    if !(0..=5).contains(&rating) {
        return Err(CoreError::Validation(format!("Invalid rating: {rating}")));
    }
    Ok(rating)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn title_strips_linebreaks() {
        assert_eq!(title("one\r\ntwo\nthree"), "one two three");
    }

    #[test]
    fn empty_title_becomes_untitled() {
        assert_eq!(title(""), "Untitled");
        assert_eq!(title("  \n  "), "Untitled");
    }

    #[test]
    fn valid_kdate_passes_through() {
        assert_eq!(kdate(Some("20260312")), "20260312");
    }

    #[test]
    fn bad_kdate_falls_back_to_today() {
        let today = chrono::Utc::now().format("%Y%m%d").to_string();
        assert_eq!(kdate(Some("20261345")), today);
        assert_eq!(kdate(Some("not-a-date")), today);
        assert_eq!(kdate(None), today);
    }

    #[test]
    fn body_size_cap() {
        assert!(body("fine").is_ok());
        let huge = "x".repeat(MAX_BODY_SIZE + 1);
        assert_matches!(body(&huge), Err(CoreError::Validation(_)));
    }

    #[test]
    fn ids_must_be_positive() {
        assert_matches!(check_id(1), Ok(1));
        assert_matches!(check_id(0), Err(CoreError::Validation(_)));
        assert_matches!(check_id(-4), Err(CoreError::Validation(_)));
    }

    #[test]
    fn rating_range() {
        assert_matches!(check_rating(0), Ok(0));
        assert_matches!(check_rating(5), Ok(5));
        assert_matches!(check_rating(6), Err(CoreError::Validation(_)));
    }
}
