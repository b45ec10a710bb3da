//! Conversion between human token amounts and integer base units.
//!
//! Amounts are scaled as decimal strings so the conversion never touches floating point.
//! A value that does not land on a whole number of base units is rejected rather than rounded.

use alloy_primitives::U256;

use crate::error::ValidationError;

/// Ten to the eighteenth, the base-unit scale of an 18-decimal token.
pub const DEFAULT_SCALING_FACTOR: u128 = 1_000_000_000_000_000_000;

/// U256 tops out below 10^78.
const MAX_POW10: u64 = 77;
const MAX_FRACTION_DIGITS: usize = 78;

pub fn pow10(exponent: u64) -> Option<U256> {
    if exponent > MAX_POW10 {
        return None;
    }
    let ten = U256::from(10u8);
    let mut value = U256::from(1u8);
    for _ in 0..exponent {
        value = value.checked_mul(ten)?;
    }
    Some(value)
}

/// Parses a user-entered amount and scales it to base units.
///
/// Accepts an optional sign, an integer and/or fractional part, and an optional
/// `e`/`E` exponent; surrounding whitespace is ignored.
pub fn parse_amount(input: &str, scaling_factor: U256) -> Result<U256, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingAmount);
    }
    let malformed = || ValidationError::Malformed {
        input: trimmed.to_string(),
    };

    let (negative, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (mantissa, exponent) = match unsigned.find(|c: char| c == 'e' || c == 'E') {
        Some(idx) => {
            let exp_str = &unsigned[idx + 1..];
            let digits = exp_str
                .strip_prefix(|c: char| c == '+' || c == '-')
                .unwrap_or(exp_str);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            let exponent = exp_str.parse::<i64>().map_err(|_| malformed())?;
            (&unsigned[..idx], exponent)
        }
        None => (unsigned, 0),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(malformed());
    }
    if !int_part
        .bytes()
        .chain(frac_part.bytes())
        .all(|b| b.is_ascii_digit())
    {
        return Err(malformed());
    }

    let digits = format!("{int_part}{frac_part}");
    let leading_trimmed = digits.trim_start_matches('0');
    if leading_trimmed.is_empty() || negative {
        return Err(ValidationError::NotPositive);
    }
    // Trailing zeros move into the exponent so long exact inputs still fit.
    let significant = leading_trimmed.trim_end_matches('0');
    let trailing_zeros = leading_trimmed.len() - significant.len();

    let overflow = || ValidationError::Overflow {
        input: trimmed.to_string(),
    };
    let excess_precision = || ValidationError::ExcessPrecision {
        input: trimmed.to_string(),
    };

    let shift = i64::try_from(trailing_zeros)
        .ok()
        .zip(i64::try_from(frac_part.len()).ok())
        .and_then(|(zeros, frac_len)| exponent.checked_add(zeros)?.checked_sub(frac_len))
        .ok_or_else(malformed)?;

    if significant.len() > MAX_FRACTION_DIGITS {
        return Err(if shift < 0 {
            excess_precision()
        } else {
            overflow()
        });
    }
    let mut mantissa = U256::from_str_radix(significant, 10).map_err(|_| overflow())?;

    if shift >= 0 {
        let multiplier = pow10(shift.unsigned_abs()).ok_or_else(overflow)?;
        return mantissa
            .checked_mul(scaling_factor)
            .and_then(|scaled| scaled.checked_mul(multiplier))
            .ok_or_else(overflow);
    }

    // Dividing by 10^k cancels k twos and k fives from mantissa and scale first.
    let mut scale = scaling_factor;
    for prime in [2u8, 5u8] {
        let prime = U256::from(prime);
        let mut needed = shift.unsigned_abs();
        for factor in [&mut mantissa, &mut scale] {
            while needed > 0 && !factor.is_zero() && (*factor % prime).is_zero() {
                *factor /= prime;
                needed -= 1;
            }
        }
        if needed > 0 {
            return Err(excess_precision());
        }
    }
    mantissa.checked_mul(scale).ok_or_else(overflow)
}

/// Renders base units in human units: no trailing zeros, no dot for whole values.
pub fn format_units(value: U256, scaling_factor: U256) -> String {
    if scaling_factor.is_zero() {
        return value.to_string();
    }
    let whole = value / scaling_factor;
    let mut remainder = value % scaling_factor;
    if remainder.is_zero() {
        return whole.to_string();
    }

    let ten = U256::from(10u8);
    let mut fraction = String::new();
    while !remainder.is_zero() && fraction.len() < MAX_FRACTION_DIGITS {
        let Some(shifted) = remainder.checked_mul(ten) else {
            break;
        };
        fraction.push_str(&(shifted / scaling_factor).to_string());
        remainder = shifted % scaling_factor;
    }
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        return whole.to_string();
    }
    format!("{whole}.{fraction}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wei() -> U256 {
        U256::from(DEFAULT_SCALING_FACTOR)
    }

    fn ether(n: u64) -> U256 {
        U256::from(n) * wei()
    }

    #[test]
    fn whole_amounts_scale_by_factor() {
        assert_eq!(parse_amount("5", wei()), Ok(ether(5)));
        assert_eq!(parse_amount("  5 ", wei()), Ok(ether(5)));
        assert_eq!(parse_amount("+5", wei()), Ok(ether(5)));
    }

    #[test]
    fn decimal_amounts_scale_exactly() {
        assert_eq!(
            parse_amount("1.5", wei()),
            Ok(U256::from(1_500_000_000_000_000_000u128))
        );
        assert_eq!(
            parse_amount(".25", wei()),
            Ok(U256::from(250_000_000_000_000_000u128))
        );
        assert_eq!(parse_amount("5.", wei()), Ok(ether(5)));
        assert_eq!(parse_amount("1.50000", wei()), parse_amount("1.5", wei()));
        assert_eq!(
            parse_amount("0.000000000000000001", wei()),
            Ok(U256::from(1u8))
        );
    }

    #[test]
    fn exponent_notation_is_accepted() {
        assert_eq!(parse_amount("1e3", wei()), Ok(ether(1000)));
        assert_eq!(parse_amount("2.5E1", wei()), Ok(ether(25)));
        assert_eq!(parse_amount("1e-18", wei()), Ok(U256::from(1u8)));
    }

    #[test]
    fn zero_and_negative_amounts_are_not_positive() {
        for input in ["0", "0.0", "-0", "-5", "-0.1", "0e10"] {
            assert_eq!(
                parse_amount(input, wei()),
                Err(ValidationError::NotPositive),
                "input {input}"
            );
        }
    }

    #[test]
    fn empty_and_garbage_amounts_are_rejected() {
        assert_eq!(parse_amount("", wei()), Err(ValidationError::MissingAmount));
        assert_eq!(parse_amount("   ", wei()), Err(ValidationError::MissingAmount));
        for input in [".", "abc", "1.2.3", "1e", "e5", "--1", "0x10", "1 000"] {
            assert!(
                matches!(
                    parse_amount(input, wei()),
                    Err(ValidationError::Malformed { .. })
                ),
                "input {input}"
            );
        }
    }

    #[test]
    fn sub_base_unit_precision_is_rejected_not_rounded() {
        assert_eq!(
            parse_amount("0.0000000000000000001", wei()),
            Err(ValidationError::ExcessPrecision {
                input: "0.0000000000000000001".into()
            })
        );
        assert!(matches!(
            parse_amount("1e-100", wei()),
            Err(ValidationError::ExcessPrecision { .. })
        ));
    }

    #[test]
    fn amounts_past_u256_overflow() {
        assert!(matches!(
            parse_amount("1e60", wei()),
            Err(ValidationError::Overflow { .. })
        ));
        let huge = "9".repeat(80);
        assert!(matches!(
            parse_amount(&huge, U256::from(1u8)),
            Err(ValidationError::Overflow { .. })
        ));
    }

    #[test]
    fn long_exact_inputs_do_not_overflow() {
        let padded = format!("1.{}", "0".repeat(60));
        assert_eq!(parse_amount(&padded, wei()), Ok(ether(1)));

        let shifted_back = format!("1{}e-100", "0".repeat(100));
        assert_eq!(parse_amount(&shifted_back, wei()), Ok(ether(1)));

        let many_digits = format!("0.{}1", "0".repeat(17));
        assert_eq!(parse_amount(&many_digits, wei()), Ok(U256::from(1u8)));
    }

    #[test]
    fn non_decimal_scaling_factor_still_requires_exact_result() {
        let factor = U256::from(4u8);
        assert_eq!(parse_amount("0.25", factor), Ok(U256::from(1u8)));
        assert!(matches!(
            parse_amount("0.1", factor),
            Err(ValidationError::ExcessPrecision { .. })
        ));
    }

    #[test]
    fn formats_like_format_ether() {
        assert_eq!(format_units(U256::ZERO, wei()), "0");
        assert_eq!(format_units(ether(21), wei()), "21");
        assert_eq!(
            format_units(U256::from(1_500_000_000_000_000_000u128), wei()),
            "1.5"
        );
        assert_eq!(format_units(U256::from(1u8), wei()), "0.000000000000000001");
        assert_eq!(format_units(U256::from(7u8), U256::from(4u8)), "1.75");
    }

    #[test]
    fn pow10_stops_at_u256_range() {
        assert_eq!(pow10(0), Some(U256::from(1u8)));
        assert_eq!(pow10(18), Some(wei()));
        assert!(pow10(77).is_some());
        assert!(pow10(78).is_none());
    }
}
