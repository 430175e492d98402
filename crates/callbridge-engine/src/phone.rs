// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-id normalization.

/// Minimum digit count of a routable phone number.
pub const MIN_PHONE_DIGITS: usize = 10;

/// Normalizes a raw caller id to a digits-only phone number.
///
/// Non-digits are stripped. An 11-digit number with the domestic trunk
/// prefix `8` is rewritten to the international prefix `7`. Anything shorter
/// than [`MIN_PHONE_DIGITS`] digits is not routable and yields `None`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    if digits.len() == 11 && digits.starts_with('8') {
        digits.replace_range(..1, "7");
    }

    (digits.len() >= MIN_PHONE_DIGITS).then_some(digits)
}

/// Raw caller ids this short are internal extensions, not phone numbers.
pub fn looks_like_extension(raw: &str) -> bool {
    raw.trim().len() <= 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domestic_prefix_rewritten() {
        assert_eq!(normalize_phone("8-916-123-45-67").as_deref(), Some("79161234567"));
    }

    #[test]
    fn formatting_stripped() {
        assert_eq!(
            normalize_phone("+7 (916) 123-45-67").as_deref(),
            Some("79161234567")
        );
    }

    #[test]
    fn short_numbers_rejected() {
        assert_eq!(normalize_phone("123"), None);
        assert_eq!(normalize_phone("101"), None);
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("<unknown>"), None);
    }

    #[test]
    fn ten_digits_accepted_unchanged() {
        assert_eq!(normalize_phone("9161234567").as_deref(), Some("9161234567"));
    }

    #[test]
    fn eight_only_rewritten_at_eleven_digits() {
        // 12 digits starting with 8 is left alone.
        assert_eq!(normalize_phone("891612345678").as_deref(), Some("891612345678"));
        // 10 digits starting with 8 is left alone.
        assert_eq!(normalize_phone("8161234567").as_deref(), Some("8161234567"));
    }

    #[test]
    fn extension_detection() {
        assert!(looks_like_extension("101"));
        assert!(looks_like_extension("2001"));
        assert!(!looks_like_extension("79161234567"));
    }

    mod props {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn output_is_digits_and_long_enough(raw in ".{0,40}") {
                if let Some(phone) = normalize_phone(&raw) {
                    prop_assert!(phone.len() >= MIN_PHONE_DIGITS);
                    prop_assert!(phone.chars().all(|c| c.is_ascii_digit()));
                }
            }

            #[test]
            fn normalization_is_idempotent(raw in "[0-9 ()+-]{0,20}") {
                if let Some(phone) = normalize_phone(&raw) {
                    prop_assert_eq!(normalize_phone(&phone), Some(phone.clone()));
                }
            }
        }
    }
}
