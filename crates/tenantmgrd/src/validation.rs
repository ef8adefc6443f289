//! VNI request validation.
//!
//! Runs before any fabric mutation on the create and update paths. Only the
//! first entry of `vniRanges` is checked; later entries are passed through to
//! the fabric unvalidated.

use thiserror::Error;

/// Largest accepted `vniCount`.
pub const MAX_VNI_COUNT: i64 = 65535;

/// Largest accepted range end.
pub const MAX_VNI_RANGE_END: i64 = 65536;

/// A rejected VNI request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VniValidationError {
    #[error("VNI count is invalid: {0}")]
    InvalidCount(i64),

    /// Carries the offending part, entry or rendered range list.
    #[error("VNI range is invalid: {0}")]
    InvalidRange(String),
}

/// Checks a VNI count and range list.
///
/// ```
/// use tenantmgrd::validation::{validate_vni_request, VniValidationError};
///
/// assert!(validate_vni_request(5, &["10-20".to_string()]).is_ok());
/// assert_eq!(
///     validate_vni_request(70000, &[]),
///     Err(VniValidationError::InvalidCount(70000))
/// );
/// ```
pub fn validate_vni_request(vni_count: i64, vni_ranges: &[String]) -> Result<(), VniValidationError> {
    if !(0..=MAX_VNI_COUNT).contains(&vni_count) {
        return Err(VniValidationError::InvalidCount(vni_count));
    }

    let Some(first) = vni_ranges.first() else {
        return Ok(());
    };

    let mut parts = first.split('-');
    let start_part = parts.next().unwrap_or_default();
    let start: i64 = start_part
        .parse()
        .map_err(|_| VniValidationError::InvalidRange(start_part.to_string()))?;

    let end_part = parts
        .next()
        .ok_or_else(|| VniValidationError::InvalidRange(first.clone()))?;
    let end: i64 = end_part
        .parse()
        .map_err(|_| VniValidationError::InvalidRange(end_part.to_string()))?;

    if start < 0 || end > MAX_VNI_RANGE_END || start > end {
        return Err(VniValidationError::InvalidRange(format!(
            "[{}]",
            vni_ranges.join(" ")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(r: &[&str]) -> Vec<String> {
        r.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_count_bounds() {
        assert!(validate_vni_request(0, &[]).is_ok());
        assert!(validate_vni_request(65535, &[]).is_ok());
        assert_eq!(
            validate_vni_request(65536, &[]).unwrap_err().to_string(),
            "VNI count is invalid: 65536"
        );
        assert_eq!(
            validate_vni_request(-1, &[]).unwrap_err().to_string(),
            "VNI count is invalid: -1"
        );
    }

    #[test]
    fn test_range_bounds() {
        assert!(validate_vni_request(5, &ranges(&["0-65536"])).is_ok());
        assert_eq!(
            validate_vni_request(5, &ranges(&["0-70000"]))
                .unwrap_err()
                .to_string(),
            "VNI range is invalid: [0-70000]"
        );
    }

    #[test]
    fn test_reversed_range() {
        assert_eq!(
            validate_vni_request(5, &ranges(&["20-10", "1-2"])).unwrap_err(),
            VniValidationError::InvalidRange("[20-10 1-2]".to_string())
        );
    }

    #[test]
    fn test_non_numeric_parts() {
        assert_eq!(
            validate_vni_request(5, &ranges(&["abc-20"])).unwrap_err(),
            VniValidationError::InvalidRange("abc".to_string())
        );
        assert_eq!(
            validate_vni_request(5, &ranges(&["10-xyz"])).unwrap_err(),
            VniValidationError::InvalidRange("xyz".to_string())
        );
    }

    #[test]
    fn test_missing_end() {
        assert_eq!(
            validate_vni_request(5, &ranges(&["10"])).unwrap_err(),
            VniValidationError::InvalidRange("10".to_string())
        );
    }

    #[test]
    fn test_empty_ranges_are_valid() {
        assert!(validate_vni_request(5, &[]).is_ok());
    }

    #[test]
    fn test_only_first_range_is_checked() {
        assert!(validate_vni_request(5, &ranges(&["10-20", "90-1", "junk"])).is_ok());
    }
}
