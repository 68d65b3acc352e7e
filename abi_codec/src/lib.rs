pub mod address;
pub mod call;
pub mod units;
pub mod value;

use domain::AddressError;
use thiserror::Error;

pub use address::{address_from_word, address_to_word};
pub use call::{encode_call, encode_named, Method, Param, ParamKind};
pub use units::{format_units, format_units_display, parse_units};
pub use value::{
    decode_decimals, decode_dynamic_string, decode_symbol, decode_uint256, encode_uint256,
    encode_uint256_str, is_valid_symbol, parse_uint_input,
};

pub const WORD_HEX_LEN: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
    #[error("uint256 cannot be negative")]
    Negative,
    #[error("invalid uint256 value: {0}")]
    NotNumeric(String),
    #[error("value does not fit in uint256: {0}")]
    Overflow(String),
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    #[error("{method} expects ({expected}), got ({actual})")]
    ArgumentMismatch {
        method: &'static str,
        expected: String,
        actual: String,
    },
    #[error("malformed ABI payload: {0}")]
    Decode(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

pub type AbiResult<T> = Result<T, AbiError>;

pub(crate) fn strip_hex_prefix(raw: &str) -> &str {
    raw.strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw)
}
