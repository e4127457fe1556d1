//! Phone number normalization
//!
//! Vendors disagree on number formats: Twilio wants E.164, Exotel wants the
//! national trunk form. Everything entering the adapters is first brought
//! to E.164.

use crate::error::TelephonyError;

/// Normalize a raw number to E.164, assuming `default_country` (digits, no
/// plus) for national numbers
pub fn normalize_phone(raw: &str, default_country: &str) -> Result<String, TelephonyError> {
    let trimmed = raw.trim();
    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() || trimmed.chars().any(|c| c.is_alphabetic()) {
        return Err(TelephonyError::InvalidNumber(raw.to_string()));
    }

    let e164 = if has_plus {
        digits
    } else if let Some(rest) = digits.strip_prefix("00") {
        rest.to_string()
    } else if digits.len() == 11 && digits.starts_with('0') {
        format!("{}{}", default_country, &digits[1..])
    } else if digits.len() == 10 {
        format!("{}{}", default_country, digits)
    } else if digits.len() == 10 + default_country.len() && digits.starts_with(default_country) {
        digits
    } else {
        return Err(TelephonyError::InvalidNumber(raw.to_string()));
    };

    if !(8..=15).contains(&e164.len()) {
        return Err(TelephonyError::InvalidNumber(raw.to_string()));
    }

    Ok(format!("+{}", e164))
}

/// National trunk form ("0" + subscriber number) of an E.164 number in
/// `country`; numbers from other countries are returned unchanged
pub fn to_national(e164: &str, country: &str) -> String {
    match e164.strip_prefix('+').and_then(|d| d.strip_prefix(country)) {
        Some(national) => format!("0{}", national),
        None => e164.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indian_formats() {
        for raw in [
            "9876543210",
            "09876543210",
            "919876543210",
            "+91 98765 43210",
            "+91-98765-43210",
            "0091 9876543210",
        ] {
            assert_eq!(normalize_phone(raw, "91").unwrap(), "+919876543210", "{}", raw);
        }
    }

    #[test]
    fn test_foreign_number_kept() {
        assert_eq!(
            normalize_phone("+1 (415) 555-0100", "91").unwrap(),
            "+14155550100"
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(normalize_phone("", "91").is_err());
        assert!(normalize_phone("DND-flagged", "91").is_err());
        assert!(normalize_phone("12345", "91").is_err());
    }

    #[test]
    fn test_national_form() {
        assert_eq!(to_national("+919876543210", "91"), "09876543210");
        assert_eq!(to_national("+14155550100", "91"), "+14155550100");
    }
}
