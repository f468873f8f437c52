//! Conversions between human readable decimal strings and fixed point token
//! amounts.
//!
//! ERC-20 tokens declare a number of decimals `d`, and an on-chain amount `a`
//! stands for the value `a / 10^d`. Parsing never rounds: an input that can't
//! be represented exactly at the token's precision is rejected, since rounding
//! would silently change how much is spent.

use {alloy::primitives::U256, thiserror::Error};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty amount")]
    Empty,
    #[error("invalid character {0:?} in amount")]
    InvalidCharacter(char),
    #[error("amount has more than {0} fractional digits")]
    TooPrecise(u8),
    #[error("amount does not fit in 256 bits")]
    Overflow,
}

/// Parses a non-negative decimal numeral into a fixed point amount with the
/// specified number of decimals.
///
/// Accepted forms are `1`, `1.5`, `.5` and `1.`; surrounding whitespace is
/// ignored. Signs, exponents and digit separators are rejected.
pub fn to_fixed_point(decimal: &str, decimals: u8) -> Result<U256, ParseError> {
    let decimal = decimal.trim();
    let (integer, fraction) = decimal.split_once('.').unwrap_or((decimal, ""));
    if integer.is_empty() && fraction.is_empty() {
        return Err(ParseError::Empty);
    }
    if let Some(c) = integer
        .chars()
        .chain(fraction.chars())
        .find(|c| !c.is_ascii_digit())
    {
        return Err(ParseError::InvalidCharacter(c));
    }
    if fraction.len() > usize::from(decimals) {
        return Err(ParseError::TooPrecise(decimals));
    }

    let mut digits = String::with_capacity(integer.len() + usize::from(decimals));
    digits.push_str(integer);
    digits.push_str(fraction);
    digits.extend(std::iter::repeat_n('0', usize::from(decimals) - fraction.len()));
    U256::from_str_radix(&digits, 10).map_err(|_| ParseError::Overflow)
}

/// Formats a fixed point amount as an exact decimal string.
///
/// Trailing fractional zeros are dropped and whole numbers are rendered
/// without a decimal point, so for any `amount`:
/// `to_fixed_point(&from_fixed_point(amount, d), d) == Ok(amount)`.
pub fn from_fixed_point(amount: U256, decimals: u8) -> String {
    let (integer, fraction) = split(amount, decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        integer.to_owned()
    } else {
        format!("{integer}.{fraction}")
    }
}

/// Formats a fixed point amount with exactly `digits` fractional digits.
///
/// Extra digits are truncated, so the displayed value never overstates the
/// amount. Only meant for display, use [`from_fixed_point`] for anything that
/// gets parsed again.
pub fn format_units(amount: U256, decimals: u8, digits: usize) -> String {
    let (integer, fraction) = split(amount, decimals);
    if digits == 0 {
        return integer.to_owned();
    }
    let mut fraction = fraction.chars().take(digits).collect::<String>();
    fraction.extend(std::iter::repeat_n('0', digits - fraction.len()));
    format!("{integer}.{fraction}")
}

/// Splits the decimal representation of `amount` into its integer and
/// fractional digits. The fractional part is always `decimals` long.
fn split(amount: U256, decimals: u8) -> (String, String) {
    let decimals = usize::from(decimals);
    let mut digits = amount.to_string();
    if digits.len() <= decimals {
        let padding = decimals + 1 - digits.len();
        digits.insert_str(0, &"0".repeat(padding));
    }
    let fraction = digits.split_off(digits.len() - decimals);
    (digits, fraction)
}
