//! Conversions between raw integer token amounts and decimal strings.

use alloy_primitives::U256;

/// Decimals of vDOT, the voting ticket and every supported native currency.
pub const TOKEN_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,
    #[error("invalid amount: {0}")]
    Invalid(String),
    #[error("too many decimal places (max {max}): {input}")]
    TooPrecise { input: String, max: u8 },
    #[error("amount overflows 256 bits: {0}")]
    Overflow(String),
}

fn ten_pow(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// Exact decimal rendering with trailing fractional zeros removed.
///
/// `1_500_000_000_000_000_000` with 18 decimals renders as `"1.5"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let divisor = ten_pow(decimals);
    let whole = value / divisor;
    let frac = value % divisor;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// [`format_units`] with 18 decimals.
pub fn format_ether(value: U256) -> String {
    format_units(value, TOKEN_DECIMALS)
}

/// Parse a non-negative decimal string into raw units.
pub fn parse_units(input: &str, decimals: u8) -> Result<U256, UnitsError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(UnitsError::Empty);
    }
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::Invalid(input.to_string()));
    }
    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) {
        return Err(UnitsError::Invalid(input.to_string()));
    }
    let frac = frac.trim_end_matches('0');
    if frac.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            input: input.to_string(),
            max: decimals,
        });
    }

    let overflow = || UnitsError::Overflow(input.to_string());
    let whole_value = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| overflow())?
    };
    let frac_value = if frac.is_empty() {
        U256::ZERO
    } else {
        let padded = format!("{frac:0<width$}", width = decimals as usize);
        U256::from_str_radix(&padded, 10).map_err(|_| overflow())?
    };

    whole_value
        .checked_mul(ten_pow(decimals))
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(overflow)
}

/// [`parse_units`] with 18 decimals.
pub fn parse_ether(input: &str) -> Result<U256, UnitsError> {
    parse_units(input, TOKEN_DECIMALS)
}

/// Dashboard rendering: grouped thousands, at most two fraction digits
/// (rounded half up), no trailing zeros. `1234567.891` renders as
/// `"1,234,567.89"`.
pub fn format_display(value: U256, decimals: u8) -> String {
    let scaled = if decimals >= 2 {
        let divisor = ten_pow(decimals - 2);
        let half = divisor / U256::from(2u64);
        (value.saturating_add(half)) / divisor
    } else {
        value.saturating_mul(ten_pow(2 - decimals))
    };
    let hundred = U256::from(100u64);
    let whole = group_thousands(&(scaled / hundred).to_string());
    let cents = (scaled % hundred).saturating_to::<u64>();
    match cents {
        0 => whole,
        c if c % 10 == 0 => format!("{whole}.{}", c / 10),
        c => format!("{whole}.{c:02}"),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Lossy conversion for UI arithmetic (percentages, previews).
pub fn to_f64(value: U256, decimals: u8) -> f64 {
    format_units(value, decimals).parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth(s: &str) -> U256 {
        parse_ether(s).unwrap()
    }

    #[test]
    fn one_and_a_half_formats_exactly() {
        let raw = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(format_units(raw, 18), "1.5");
        assert_eq!(eth("1.5"), raw);
    }

    #[test]
    fn formatting_is_idempotent() {
        let raw = U256::from(123_456_789_000_000_000_000u128);
        let once = format_ether(raw);
        let twice = format_ether(eth(&once));
        assert_eq!(once, twice);
        assert_eq!(once, "123.456789");
    }

    #[test]
    fn whole_and_zero_values() {
        assert_eq!(format_ether(U256::ZERO), "0");
        assert_eq!(format_ether(eth("42")), "42");
        assert_eq!(format_units(U256::from(7u64), 0), "7");
        assert_eq!(format_units(U256::from(1u64), 18), "0.000000000000000001");
    }

    #[test]
    fn parse_accepts_leading_dot_and_trailing_zeros() {
        assert_eq!(eth(".5"), eth("0.5"));
        assert_eq!(eth("2.500"), eth("2.5"));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(parse_ether(""), Err(UnitsError::Empty));
        assert!(matches!(parse_ether("-1"), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_ether("1.2.3"), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_ether("."), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_units("1.234", 2), Err(UnitsError::TooPrecise { .. })));
    }

    #[test]
    fn display_groups_and_rounds() {
        assert_eq!(format_display(eth("1234567.891"), 18), "1,234,567.89");
        assert_eq!(format_display(eth("128520"), 18), "128,520");
        assert_eq!(format_display(eth("0.995"), 18), "1");
        assert_eq!(format_display(eth("24.5"), 18), "24.5");
        assert_eq!(format_display(eth("0.004"), 18), "0");
        assert_eq!(format_display(U256::from(5u64), 0), "5");
    }

    #[test]
    fn to_f64_is_close() {
        assert!((to_f64(eth("96.4"), 18) - 96.4).abs() < 1e-9);
    }
}
