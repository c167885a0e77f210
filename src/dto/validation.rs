//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest team or player name accepted.
pub const MAX_NAME_LEN: usize = 80;

/// Validates that a display name has visible characters and a sane length.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Dua & Amal") // Ok
/// validate_display_name("   ")        // Err - blank
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Name must not be blank".into());
        return Err(err);
    }

    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        let mut err = ValidationError::new("name_length");
        err.message = Some(
            format!("Name must be at most {MAX_NAME_LEN} characters (got {len})").into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_display_name_valid() {
        assert!(validate_display_name("Manaal & Ahmed").is_ok());
        assert!(validate_display_name("X").is_ok());
    }

    #[test]
    fn test_validate_display_name_blank() {
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name(" \t ").is_err());
    }

    #[test]
    fn test_validate_display_name_too_long() {
        assert!(validate_display_name(&"a".repeat(MAX_NAME_LEN)).is_ok());
        assert!(validate_display_name(&"a".repeat(MAX_NAME_LEN + 1)).is_err());
    }
}
