use ethers::{
    types::U256,
    utils::{format_units, parse_units},
};

use crate::error::{BridgeError, BridgeResult};

/// An integer amount together with the number of decimals it is scaled by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAmount {
    pub value: U256,
    pub decimals: u8,
}

impl FixedAmount {
    pub fn new(value: U256, decimals: u8) -> Self {
        Self { value, decimals }
    }

    /// Builds a fixed amount from an `f64` rate, truncating beyond `decimals`.
    pub fn from_f64(rate: f64, decimals: u8) -> BridgeResult<Self> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(BridgeError::InvalidState(format!("invalid rate {}", rate)));
        }
        let formatted = format!("{:.*}", decimals as usize, rate);
        Ok(Self::new(parse_token_amount(&formatted, decimals)?, decimals))
    }
}

/// Largest power of ten that fits in a `U256`; also the most decimals a
/// token may declare.
pub const MAX_DECIMALS: u8 = 77;

fn pow10(exponent: u16) -> Option<U256> {
    (exponent <= MAX_DECIMALS as u16).then(|| U256::exp10(exponent as usize))
}

/// Multiplies two differently-scaled amounts and expresses the product with
/// `output_decimals`. `None` when the product does not fit in a `U256`.
pub fn multiply_amounts(a: FixedAmount, b: FixedAmount, output_decimals: u8) -> Option<U256> {
    let product = a.value.checked_mul(b.value)?;
    let product_decimals = a.decimals as u16 + b.decimals as u16;
    let output = output_decimals as u16;

    if product_decimals >= output {
        // A divisor beyond U256 range truncates everything away.
        Some(pow10(product_decimals - output).map_or(U256::zero(), |divisor| product / divisor))
    } else {
        product.checked_mul(pow10(output - product_decimals)?)
    }
}

/// Formats a token amount without trailing zeros, e.g. `1500000` @ 6 → `"1.5"`.
pub fn format_token_amount(amount: U256, decimals: u8) -> BridgeResult<String> {
    let formatted = format_units(amount, decimals as u32).map_err(|e| {
        BridgeError::InvalidState(format!(
            "cannot format {} with {} decimals: {}",
            amount, decimals, e
        ))
    })?;

    if formatted.contains('.') {
        Ok(formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string())
    } else {
        Ok(formatted)
    }
}

/// Parses a human decimal string into an integer scaled by `decimals`.
pub fn parse_token_amount(input: &str, decimals: u8) -> BridgeResult<U256> {
    let invalid = |reason: &str| {
        BridgeError::InvalidState(format!("invalid amount {:?}: {}", input, reason))
    };
    let input_trimmed = input.trim();

    let (integer, fraction) = match input_trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (input_trimmed, ""),
    };
    if integer.is_empty() && fraction.is_empty() {
        return Err(invalid("empty"));
    }
    if !integer.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid("not a non-negative decimal number"));
    }
    if decimals > MAX_DECIMALS {
        return Err(invalid("too many token decimals"));
    }
    if fraction.len() > decimals as usize {
        return Err(invalid("too many decimal places"));
    }

    let normalized = format!(
        "{}.{}",
        if integer.is_empty() { "0" } else { integer },
        if fraction.is_empty() { "0" } else { fraction }
    );
    parse_units(normalized, decimals as u32)
        .map(Into::into)
        .map_err(|e| invalid(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::exp10(18)
    }

    #[test]
    fn test_multiply_differently_scaled_amounts() {
        // 2 ETH (18 decimals) at 1850.25 USD (2 decimals) expressed with 2 decimals.
        let amount = FixedAmount::new(eth(2), 18);
        let rate = FixedAmount::new(U256::from(185_025u64), 2);

        assert_eq!(multiply_amounts(amount, rate, 2), Some(U256::from(370_050u64)));
    }

    #[test]
    fn test_multiply_scales_up_when_needed() {
        let a = FixedAmount::new(U256::from(3u64), 0);
        let b = FixedAmount::new(U256::from(15u64), 1);

        assert_eq!(multiply_amounts(a, b, 4), Some(U256::from(45_000u64)));
    }

    #[test]
    fn test_multiply_with_extreme_decimals() {
        // 5 units of an 80-decimal token at a rate of 1.00000000.
        let tiny = FixedAmount::new(U256::from(5u64), 80);
        let rate = FixedAmount::new(U256::exp10(8), 8);
        assert_eq!(multiply_amounts(tiny, rate, 2), Some(U256::zero()));

        let one = FixedAmount::new(U256::one(), 0);
        assert_eq!(multiply_amounts(one, one, 78), None);
        assert_eq!(multiply_amounts(one, one, MAX_DECIMALS), Some(U256::exp10(77)));

        let huge = FixedAmount::new(U256::MAX, 0);
        assert_eq!(multiply_amounts(huge, FixedAmount::new(2u64.into(), 0), 0), None);
    }

    #[test]
    fn test_format_token_amount() {
        assert_eq!(format_token_amount(eth(1), 18).unwrap(), "1");
        assert_eq!(format_token_amount(U256::from(1_500_000u64), 6).unwrap(), "1.5");
        assert_eq!(format_token_amount(U256::from(1u64), 6).unwrap(), "0.000001");
        assert_eq!(format_token_amount(U256::zero(), 18).unwrap(), "0");
    }

    #[test]
    fn test_amounts_beyond_max_decimals_are_rejected() {
        assert!(format_token_amount(U256::from(5u64), 80).is_err());
        assert!(parse_token_amount("5", 80).is_err());
        assert!(format_token_amount(U256::from(5u64), MAX_DECIMALS).is_ok());
    }

    #[test]
    fn test_parse_token_amount() {
        assert_eq!(parse_token_amount("1", 18).unwrap(), eth(1));
        assert_eq!(parse_token_amount("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(parse_token_amount(".5", 1).unwrap(), U256::from(5u64));
        assert_eq!(parse_token_amount("2.", 2).unwrap(), U256::from(200u64));
    }

    #[test]
    fn test_parse_rejects_invalid_amounts() {
        assert!(parse_token_amount("", 18).is_err());
        assert!(parse_token_amount("-1", 18).is_err());
        assert!(parse_token_amount("1.0000001", 6).is_err());
        assert!(parse_token_amount("1e18", 18).is_err());
        assert!(parse_token_amount("1.2.3", 18).is_err());
    }

    #[test]
    fn test_format_parse_preserves_value() {
        let value = U256::from_dec_str("123456789012345678901").unwrap();
        let text = format_token_amount(value, 18).unwrap();

        assert_eq!(text, "123.456789012345678901");
        assert_eq!(parse_token_amount(&text, 18).unwrap(), value);
    }

    #[test]
    fn test_fixed_amount_from_f64() {
        let rate = FixedAmount::from_f64(1850.25, 2).unwrap();
        assert_eq!(rate.value, U256::from(185_025u64));
        assert!(FixedAmount::from_f64(f64::NAN, 2).is_err());
        assert!(FixedAmount::from_f64(-1.0, 2).is_err());
    }
}
