//! Numeric input sanitising for user-typed amounts.

use std::sync::LazyLock;

use regex::Regex;

static DECIMAL_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?[0-9]*[.,]?[0-9]*$").expect("decimal input pattern compiles")
});

/// Parse a user-typed decimal. A comma is accepted as the decimal
/// separator. Anything that is not a plain decimal, including the empty
/// string, gives `NaN` so that the field's validators flag it.
pub fn parse_decimal_input(input: &str) -> f64 {
    let trimmed = input.trim();
    if !DECIMAL_INPUT.is_match(trimmed) {
        return f64::NAN;
    }
    trimmed.replace(',', ".").parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dots_and_commas() {
        assert_eq!(parse_decimal_input("12.5"), 12.5);
        assert_eq!(parse_decimal_input("12,5"), 12.5);
        assert_eq!(parse_decimal_input(" 3 "), 3.0);
        assert_eq!(parse_decimal_input("-0,25"), -0.25);
        assert_eq!(parse_decimal_input(".5"), 0.5);
        assert_eq!(parse_decimal_input("7."), 7.0);
    }

    #[test]
    fn rejects_everything_else() {
        for input in ["", "-", ".", "1.2.3", "1e3", "abc", "12a", "1,2,3", "--1"] {
            assert!(parse_decimal_input(input).is_nan(), "{input:?} should be NaN");
        }
    }

    #[test]
    fn pattern_is_anchored() {
        assert!(DECIMAL_INPUT.is_match("12,5"));
        assert!(!DECIMAL_INPUT.is_match("x12,5"));
        assert!(!DECIMAL_INPUT.is_match("12,5x"));
    }
}
