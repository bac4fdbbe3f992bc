//! Validation of decimal number strings carried in `N` values.
//!
//! The store accepts up to 38 significant digits with a magnitude between
//! 10^-130 and 10^125. Anything else is rejected server-side, so the core
//! checks operands and marshaled numbers up front.

use thiserror::Error;

/// Maximum number of significant digits the store keeps for a number.
pub const MAX_SIGNIFICANT_DIGITS: usize = 38;

/// Largest allowed decimal exponent of a number's leading digit.
const MAX_MAGNITUDE: i64 = 125;

/// Smallest allowed decimal exponent of a number's leading digit.
const MIN_MAGNITUDE: i64 = -130;

/// Reasons a number string is not a valid store number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberError {
    /// Not a decimal literal (empty, NaN, stray characters, spaces).
    #[error("'{0}' is not a valid decimal number")]
    Malformed(String),
    /// More significant digits than the store keeps.
    #[error("'{0}' has more than {MAX_SIGNIFICANT_DIGITS} significant digits")]
    TooPrecise(String),
    /// Magnitude outside the supported range.
    #[error("'{0}' is outside the supported numeric range")]
    OutOfRange(String),
}

/// Validate a decimal number string for format, magnitude, and precision.
///
/// # Errors
///
/// Returns a [`NumberError`] describing the first violation found.
pub fn validate_number(s: &str) -> Result<(), NumberError> {
    let malformed = || NumberError::Malformed(s.to_owned());

    if s.is_empty() || s != s.trim() {
        return Err(malformed());
    }

    let rest = s.strip_prefix(['+', '-']).unwrap_or(s);

    let (mantissa, explicit_exp) = match rest.find(['e', 'E']) {
        Some(pos) => {
            let exp: i64 = rest[pos + 1..].parse().map_err(|_| malformed())?;
            (&rest[..pos], exp)
        }
        None => (rest, 0i64),
    };

    let mut has_dot = false;
    let mut has_digit = false;
    for ch in mantissa.chars() {
        match ch {
            '.' if !has_dot => has_dot = true,
            c if c.is_ascii_digit() => has_digit = true,
            _ => return Err(malformed()),
        }
    }
    if !has_digit {
        return Err(malformed());
    }

    let all_digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let trimmed_leading = all_digits.trim_start_matches('0');
    let significant = trimmed_leading.trim_end_matches('0');

    // Zero is valid regardless of exponent.
    if significant.is_empty() {
        return Ok(());
    }

    if significant.len() > MAX_SIGNIFICANT_DIGITS {
        return Err(NumberError::TooPrecise(s.to_owned()));
    }

    // Exponent of the leading significant digit.
    #[allow(clippy::cast_possible_wrap)]
    let frac_digits = mantissa.find('.').map_or(0, |pos| (mantissa.len() - pos - 1) as i64);
    #[allow(clippy::cast_possible_wrap)]
    let magnitude = explicit_exp
        .saturating_sub(frac_digits)
        .saturating_add(trimmed_leading.len() as i64 - 1);

    if !(MIN_MAGNITUDE..=MAX_MAGNITUDE).contains(&magnitude) {
        return Err(NumberError::OutOfRange(s.to_owned()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_accept_common_numbers() {
        for n in ["0", "25", "-7", "+3", "1640995200", "1.5", ".5", "5.", "1e10", "-2.5E-3"] {
            assert!(validate_number(n).is_ok(), "{n} should be valid");
        }
    }

    #[test]
    fn test_should_reject_malformed_numbers() {
        for n in ["", " 1", "1 ", "NaN", "inf", "1.2.3", "e5", "-", "1e", "0x10"] {
            assert!(
                matches!(validate_number(n), Err(NumberError::Malformed(_))),
                "{n} should be malformed"
            );
        }
    }

    #[test]
    fn test_should_reject_excess_precision() {
        let n = "1".repeat(39);
        assert!(matches!(validate_number(&n), Err(NumberError::TooPrecise(_))));
        assert!(validate_number(&"1".repeat(38)).is_ok());
    }

    #[test]
    fn test_should_enforce_magnitude_bounds() {
        assert!(validate_number("9.9e125").is_ok());
        assert!(matches!(validate_number("1e126"), Err(NumberError::OutOfRange(_))));
        assert!(validate_number("1e-130").is_ok());
        assert!(matches!(validate_number("1e-131"), Err(NumberError::OutOfRange(_))));
        assert!(validate_number("0e999").is_ok());
    }
}
