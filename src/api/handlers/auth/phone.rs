//! Phone number normalization for the login form.

use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) const DEFAULT_COUNTRY_CODE: &str = "+255";

static E164: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\+[1-9][0-9]{6,14}$").ok());

/// Normalize user input to E.164.
///
/// Numbers without a leading `+` are treated as national numbers: leading
/// zeros are dropped and `country_code` is prepended. Returns `None` when the
/// result is not a plausible E.164 number.
pub(crate) fn normalize_phone(input: &str, country_code: &str) -> Option<String> {
    let compact: String = input
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    let candidate = if compact.starts_with('+') {
        compact
    } else {
        let national = compact.trim_start_matches('0');
        let prefix = country_code.trim();
        if prefix.starts_with('+') {
            format!("{prefix}{national}")
        } else {
            format!("+{prefix}{national}")
        }
    };

    valid_e164(&candidate).then_some(candidate)
}

fn valid_e164(phone: &str) -> bool {
    E164.as_ref().is_some_and(|regex| regex.is_match(phone))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn e164_pattern_compiles() {
        assert!(E164.is_some());
        assert!(valid_e164("+255712345678"));
        assert!(!valid_e164("255712345678"));
    }

    #[test]
    fn national_number_gets_country_code() {
        assert_eq!(
            normalize_phone("0629123456", DEFAULT_COUNTRY_CODE).as_deref(),
            Some("+255629123456")
        );
    }

    #[test]
    fn all_leading_zeros_are_stripped() {
        assert_eq!(
            normalize_phone("00712345678", "+255").as_deref(),
            Some("+255712345678")
        );
    }

    #[test]
    fn international_number_is_kept() {
        assert_eq!(
            normalize_phone("+254712345678", DEFAULT_COUNTRY_CODE).as_deref(),
            Some("+254712345678")
        );
    }

    #[test]
    fn spaces_and_dashes_are_removed() {
        assert_eq!(
            normalize_phone("  0712-345 678 ", DEFAULT_COUNTRY_CODE).as_deref(),
            Some("+255712345678")
        );
    }

    #[test]
    fn country_code_without_plus_is_accepted() {
        assert_eq!(
            normalize_phone("712345678", "255").as_deref(),
            Some("+255712345678")
        );
    }

    #[test]
    fn rejects_garbage_and_short_numbers() {
        assert_eq!(normalize_phone("", DEFAULT_COUNTRY_CODE), None);
        assert_eq!(normalize_phone("abc", DEFAULT_COUNTRY_CODE), None);
        assert_eq!(normalize_phone("+12", DEFAULT_COUNTRY_CODE), None);
        assert_eq!(normalize_phone("+0712345678", DEFAULT_COUNTRY_CODE), None);
        assert_eq!(normalize_phone("+2557123456789012", DEFAULT_COUNTRY_CODE), None);
    }
}
