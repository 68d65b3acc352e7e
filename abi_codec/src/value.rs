use domain::MAX_DECIMALS;
use ethers::types::U256;

use crate::{strip_hex_prefix, AbiError, AbiResult, WORD_HEX_LEN};

pub const MAX_STRING_BYTES: usize = 1024;

pub fn encode_uint256(value: U256) -> String {
    format!("{:0>width$}", format!("{value:x}"), width = WORD_HEX_LEN)
}

pub fn encode_uint256_str(input: &str) -> AbiResult<String> {
    parse_uint_input(input).map(encode_uint256)
}

pub fn parse_uint_input(input: &str) -> AbiResult<U256> {
    let cleaned = input.trim();
    if cleaned.starts_with('-') {
        return Err(AbiError::Negative);
    }
    if let Some(digits) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AbiError::NotNumeric(cleaned.to_string()));
        }
        let significant = digits.trim_start_matches('0');
        if significant.len() > WORD_HEX_LEN {
            return Err(AbiError::Overflow(cleaned.to_string()));
        }
        if significant.is_empty() {
            return Ok(U256::zero());
        }
        return U256::from_str_radix(significant, 16)
            .map_err(|_| AbiError::Overflow(cleaned.to_string()));
    }
    if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AbiError::NotNumeric(cleaned.to_string()));
    }
    U256::from_dec_str(cleaned).map_err(|_| AbiError::Overflow(cleaned.to_string()))
}

pub fn decode_uint256(word: &str) -> AbiResult<U256> {
    let digits = strip_hex_prefix(word.trim());
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AbiError::Decode(format!("non-hex uint256 reply: {word}")));
    }
    let first = &digits[..digits.len().min(WORD_HEX_LEN)];
    let significant = first.trim_start_matches('0');
    if significant.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(significant, 16)
        .map_err(|err| AbiError::Decode(format!("uint256 reply {word}: {err:?}")))
}

pub fn decode_decimals(word: &str) -> AbiResult<u8> {
    let value = decode_uint256(word)?;
    if value > U256::from(MAX_DECIMALS) {
        return Err(AbiError::Decode(format!("decimals out of range: {value}")));
    }
    u8::try_from(value.low_u32()).map_err(|_| AbiError::Decode(format!("decimals {value}")))
}

/// 也接受部分舊代幣的 bytes32 格式；解不出來就回傳空字串，不會失敗。
pub fn decode_dynamic_string(payload: &str) -> String {
    let digits = strip_hex_prefix(payload.trim());
    if digits.is_empty() || digits.len() % 2 != 0 {
        return String::new();
    }
    let Ok(bytes) = hex::decode(digits) else {
        return String::new();
    };
    let text = if bytes.len() == 32 {
        &bytes[..]
    } else if let Some(body) = dynamic_body(&bytes) {
        body
    } else {
        return String::new();
    };
    String::from_utf8_lossy(text)
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

fn dynamic_body(bytes: &[u8]) -> Option<&[u8]> {
    if bytes.len() < 64 {
        return None;
    }
    let offset = word_to_usize(&bytes[..32])?;
    let length_end = offset.checked_add(32)?;
    let length = word_to_usize(bytes.get(offset..length_end)?)?;
    if length > MAX_STRING_BYTES {
        return None;
    }
    let end = length_end.checked_add(length)?;
    bytes.get(length_end..end)
}

fn word_to_usize(word: &[u8]) -> Option<usize> {
    let (high, low) = word.split_at(24);
    if high.iter().any(|b| *b != 0) {
        return None;
    }
    let low: [u8; 8] = low.try_into().ok()?;
    usize::try_from(u64::from_be_bytes(low)).ok()
}

pub fn is_valid_symbol(symbol: &str) -> bool {
    let trimmed = symbol.trim();
    (1..=10).contains(&trimmed.len()) && trimmed.bytes().all(|b| b.is_ascii_alphanumeric())
}

pub fn decode_symbol(payload: &str, fallback: &str) -> String {
    let decoded = decode_dynamic_string(payload);
    if is_valid_symbol(&decoded) {
        decoded.to_uppercase()
    } else {
        fallback.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic(text: &str) -> String {
        let mut padded = hex::encode(text);
        while padded.len() % 64 != 0 || padded.is_empty() {
            padded.push('0');
        }
        format!(
            "0x{}{}{}",
            encode_uint256(U256::from(32)),
            encode_uint256(U256::from(text.len())),
            padded
        )
    }

    #[test]
    fn encodes_255_as_padded_word() {
        let word = encode_uint256(U256::from(255));
        assert_eq!(word.len(), 64);
        assert!(word.ends_with("ff"));
        assert_eq!(encode_uint256_str("255").unwrap(), word);
        assert_eq!(encode_uint256_str("0xff").unwrap(), word);
    }

    #[test]
    fn rejects_negative_and_non_numeric() {
        assert_eq!(encode_uint256_str("-1"), Err(AbiError::Negative));
        assert!(matches!(encode_uint256_str("12a"), Err(AbiError::NotNumeric(_))));
        assert!(matches!(encode_uint256_str(""), Err(AbiError::NotNumeric(_))));
        assert!(matches!(encode_uint256_str("0x"), Err(AbiError::NotNumeric(_))));
        let too_big = format!("0x1{}", "0".repeat(64));
        assert!(matches!(encode_uint256_str(&too_big), Err(AbiError::Overflow(_))));
    }

    #[test]
    fn uint256_round_trip() {
        for word in [
            "0".repeat(64),
            format!("{}ff", "0".repeat(62)),
            format!("{}de0b6b3a7640000", "0".repeat(49)),
            "f".repeat(64),
        ] {
            let decoded = decode_uint256(&word).unwrap();
            assert_eq!(encode_uint256(decoded), word);
        }
    }

    #[test]
    fn empty_reply_decodes_to_zero() {
        assert_eq!(decode_uint256("").unwrap(), U256::zero());
        assert_eq!(decode_uint256("0x").unwrap(), U256::zero());
        assert!(decode_uint256("0xzz").is_err());
    }

    #[test]
    fn decimals_are_bounded() {
        assert_eq!(decode_decimals(&encode_uint256(U256::from(6))).unwrap(), 6);
        assert!(decode_decimals(&encode_uint256(U256::from(78))).is_err());
    }

    #[test]
    fn decodes_dynamic_and_bytes32_strings() {
        assert_eq!(decode_dynamic_string(&dynamic("USDT")), "USDT");
        let bytes32 = format!("0x{:0<64}", hex::encode("MKR"));
        assert_eq!(decode_dynamic_string(&bytes32), "MKR");
    }

    #[test]
    fn malformed_strings_decode_to_empty() {
        let oversized = format!(
            "0x{}{}",
            encode_uint256(U256::from(32)),
            encode_uint256(U256::from(1_000_000u64))
        );
        let truncated_body = format!(
            "0x{}{}{}",
            encode_uint256(U256::from(32)),
            encode_uint256(U256::from(40)),
            "41".repeat(8)
        );
        let bad_offset = format!("0x{}{}", "f".repeat(64), "0".repeat(64));
        for payload in [
            "",
            "0x",
            "0x0",
            "0xzz",
            "0x4142",
            &"00".repeat(40),
            &oversized,
            &truncated_body,
            &bad_offset,
        ] {
            assert_eq!(decode_dynamic_string(payload), "", "payload {payload}");
        }
    }

    #[test]
    fn strips_control_characters() {
        assert_eq!(decode_dynamic_string(&dynamic("CA\u{1}KE\n")), "CAKE");
    }

    #[test]
    fn symbol_falls_back_when_implausible() {
        assert_eq!(decode_symbol(&dynamic("cake"), "TOKEN"), "CAKE");
        assert_eq!(decode_symbol(&dynamic("Wrapped Ether"), "TOKEN"), "TOKEN");
        assert_eq!(decode_symbol("0x", "TOKEN"), "TOKEN");
        assert_eq!(decode_symbol(&dynamic("ABCDEFGHIJK"), "TOKEN"), "TOKEN");
    }
}
