use ethers::types::U256;

use crate::{AbiError, AbiResult};

/// Fraction digits beyond `decimals` are truncated.
pub fn parse_units(value: &str, decimals: u8) -> AbiResult<U256> {
    let cleaned = value.trim();
    if cleaned.is_empty() {
        return Err(AbiError::InvalidAmount("empty string".to_string()));
    }
    let mut parts = cleaned.split('.');
    let integer = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();
    if parts.next().is_some() {
        return Err(AbiError::InvalidAmount("multiple decimal points".to_string()));
    }
    if integer.is_empty() || !integer.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AbiError::InvalidAmount(
            "non-numeric characters in integer part".to_string(),
        ));
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AbiError::InvalidAmount(
            "non-numeric characters in fractional part".to_string(),
        ));
    }

    let decimals = decimals as usize;
    let fraction = &fraction[..fraction.len().min(decimals)];
    let combined = format!("{integer}{fraction:0<decimals$}");
    U256::from_dec_str(&combined)
        .map_err(|_| AbiError::InvalidAmount(format!("{cleaned} does not fit in uint256")))
}

pub fn format_units(value: U256, decimals: u8) -> String {
    format_units_display(value, decimals, decimals as usize)
}

/// Like [`format_units`] but truncates the fraction to `display` digits.
pub fn format_units_display(value: U256, decimals: u8, display: usize) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = format!("{digits:0>width$}", width = decimals + 1);
    let (integer, fraction) = padded.split_at(padded.len() - decimals);
    let truncated = fraction[..display.min(decimals)].trim_end_matches('0');
    if truncated.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{truncated}")
    }
}
