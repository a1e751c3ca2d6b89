//! Phone number utilities

use once_cell::sync::Lazy;
use regex::Regex;

// Dial code such as +91 or +1268
static DIAL_CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[1-9]\d{0,3}$").expect("dial code pattern is valid")
});

// National subscriber number, digits only after normalization
static NATIONAL_NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{6,14}$").expect("national number pattern is valid")
});

// International phone number regex (E.164 format)
static INTERNATIONAL_PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[1-9]\d{1,14}$").expect("E.164 pattern is valid")
});

/// Normalize a phone number by removing common formatting characters
pub fn normalize_phone_number(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// Normalize a dial code: trims whitespace and adds the leading `+` when missing
pub fn normalize_dial_code(country_code: &str) -> String {
    let digits: String = country_code.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        String::new()
    } else {
        format!("+{}", digits)
    }
}

/// Check if a dial code is well formed (`+` followed by 1-4 digits)
pub fn is_valid_dial_code(country_code: &str) -> bool {
    DIAL_CODE_REGEX.is_match(&normalize_dial_code(country_code))
}

/// Check if a national number (without dial code) is plausible
pub fn is_valid_national_number(phone: &str) -> bool {
    let normalized: String = normalize_phone_number(phone).replace('+', "");
    NATIONAL_NUMBER_REGEX.is_match(&normalized)
}

/// Check if a phone number is valid (international E.164 format)
pub fn is_valid_international_phone(phone: &str) -> bool {
    let normalized = normalize_phone_number(phone);
    INTERNATIONAL_PHONE_REGEX.is_match(&normalized)
}

/// Join a dial code and national number into E.164 form
pub fn to_e164(country_code: &str, phone: &str) -> String {
    let national: String = normalize_phone_number(phone).replace('+', "");
    format!("{}{}", normalize_dial_code(country_code), national)
}

/// Mask a phone number for display (e.g., +91****3210)
pub fn mask_phone_number(phone: &str) -> String {
    let normalized = normalize_phone_number(phone);
    if normalized.len() >= 7 {
        format!(
            "{}****{}",
            &normalized[0..3],
            &normalized[normalized.len() - 4..]
        )
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone_number() {
        assert_eq!(normalize_phone_number("98765-43210"), "9876543210");
        assert_eq!(normalize_phone_number("+91 98765 43210"), "+919876543210");
        assert_eq!(normalize_phone_number("(987) 654-3210"), "9876543210");
    }

    #[test]
    fn test_dial_code() {
        assert_eq!(normalize_dial_code("91"), "+91");
        assert_eq!(normalize_dial_code(" +44 "), "+44");
        assert_eq!(normalize_dial_code(""), "");
        assert!(is_valid_dial_code("+91"));
        assert!(is_valid_dial_code("1"));
        assert!(!is_valid_dial_code("+0"));
        assert!(!is_valid_dial_code("+12345"));
    }

    #[test]
    fn test_national_number() {
        assert!(is_valid_national_number("9876543210"));
        assert!(is_valid_national_number("98765 43210"));
        assert!(!is_valid_national_number("12345"));
        assert!(!is_valid_national_number(""));
    }

    #[test]
    fn test_to_e164() {
        assert_eq!(to_e164("+91", "98765 43210"), "+919876543210");
        assert_eq!(to_e164("44", "7911123456"), "+447911123456");
        assert!(is_valid_international_phone(&to_e164("+91", "9876543210")));
    }

    #[test]
    fn test_mask_phone_number() {
        assert_eq!(mask_phone_number("9876543210"), "987****3210");
        assert_eq!(mask_phone_number("+919876543210"), "+91****3210");
        assert_eq!(mask_phone_number("12345"), "****");
    }
}
