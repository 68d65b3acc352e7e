use domain::Address;

use crate::{strip_hex_prefix, WORD_HEX_LEN};

pub fn address_to_word(address: &Address) -> String {
    format!("{:0>width$}", address.hex_digits(), width = WORD_HEX_LEN)
}

// ⚠️ 只用在成功的回傳上，資料太短就解成零地址
pub fn address_from_word(word: &str) -> Address {
    let digits = strip_hex_prefix(word.trim());
    if digits.len() < 40 || !digits.is_ascii() {
        return Address::ZERO;
    }
    let tail = &digits[digits.len() - 40..];
    Address::normalize(&format!("0x{tail}")).unwrap_or(Address::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VAULT: &str = "0xd2e7da1e8e2cda1512a5cc9d1c477d95599f0ec4";

    #[test]
    fn word_is_left_padded() {
        let address = Address::normalize(VAULT).unwrap();
        let word = address_to_word(&address);
        assert_eq!(word.len(), 64);
        assert_eq!(&word[..24], "000000000000000000000000");
        assert_eq!(&word[24..], &VAULT[2..]);
    }

    #[test]
    fn decodes_right_aligned_address() {
        let reply = format!("0x000000000000000000000000{}", VAULT[2..].to_uppercase());
        assert_eq!(address_from_word(&reply).to_string(), VAULT);
    }

    #[test]
    fn short_or_empty_reply_is_zero_address() {
        assert_eq!(address_from_word(""), Address::ZERO);
        assert_eq!(address_from_word("0x"), Address::ZERO);
        assert_eq!(address_from_word("0x1234"), Address::ZERO);
        assert_eq!(
            address_from_word("0xzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz"),
            Address::ZERO
        );
    }
}
