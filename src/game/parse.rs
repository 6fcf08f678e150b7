//! Parsing of numbers as the game displays them.
//!
//! Handles thousands separators, surrounding words ("1,234 cookies",
//! "per second: 5.2") and English magnitude words ("1.5 million").

/// Magnitude words in ascending order, each 1000x the previous.
const MAGNITUDES: &[&str] = &[
    "thousand",
    "million",
    "billion",
    "trillion",
    "quadrillion",
    "quintillion",
    "sextillion",
    "septillion",
    "octillion",
    "nonillion",
    "decillion",
];

/// Extract the first number from display text.
///
/// Returns `None` when the text contains no digits.
pub fn parse_display_number(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "");
    let start = cleaned.find(|c: char| c.is_ascii_digit())?;
    let rest = &cleaned[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let number: f64 = rest[..end].trim_end_matches('.').parse().ok()?;

    let tail = rest[end..].trim_start().to_ascii_lowercase();
    let word: String = tail.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let multiplier = MAGNITUDES
        .iter()
        .position(|m| *m == word)
        .map(|i| 1000f64.powi(i as i32 + 1))
        .unwrap_or(1.0);

    let value = number * multiplier;
    value.is_finite().then_some(value)
}

/// Owned count as displayed; blank or non-numeric text means none owned.
pub fn parse_owned_count(text: &str) -> u32 {
    text.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_separated_numbers() {
        assert_eq!(parse_display_number("42"), Some(42.0));
        assert_eq!(parse_display_number("1,234 cookies"), Some(1_234.0));
        assert_eq!(parse_display_number("per second: 5.2"), Some(5.2));
    }

    #[test]
    fn magnitude_words() {
        assert_eq!(parse_display_number("1.5 million cookies"), Some(1_500_000.0));
        assert_eq!(parse_display_number("2 Billion"), Some(2e9));
        assert_eq!(parse_display_number("3.25 quadrillion"), Some(3.25e15));
    }

    #[test]
    fn unknown_word_is_ignored() {
        assert_eq!(parse_display_number("12 cookies"), Some(12.0));
    }

    #[test]
    fn no_digits_is_none() {
        assert_eq!(parse_display_number("loading..."), None);
        assert_eq!(parse_display_number(""), None);
    }

    #[test]
    fn trailing_dot_is_tolerated() {
        assert_eq!(parse_display_number("7. cookies"), Some(7.0));
    }

    #[test]
    fn owned_count_falls_back_to_zero() {
        assert_eq!(parse_owned_count("12"), 12);
        assert_eq!(parse_owned_count(""), 0);
        assert_eq!(parse_owned_count("n/a"), 0);
    }
}
