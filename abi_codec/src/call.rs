use std::{fmt, str::FromStr};

use domain::Address;
use ethers::types::U256;

use crate::{
    address::address_to_word,
    value::{encode_uint256, parse_uint_input},
    AbiError, AbiResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Address,
    Uint256,
}

impl ParamKind {
    fn as_str(self) -> &'static str {
        match self {
            ParamKind::Address => "address",
            ParamKind::Uint256 => "uint256",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Address(Address),
    Uint256(U256),
}

impl Param {
    pub fn kind(&self) -> ParamKind {
        match self {
            Param::Address(_) => ParamKind::Address,
            Param::Uint256(_) => ParamKind::Uint256,
        }
    }

    pub fn parse(kind: ParamKind, text: &str) -> AbiResult<Self> {
        match kind {
            ParamKind::Address => Ok(Param::Address(Address::normalize(text)?)),
            ParamKind::Uint256 => Ok(Param::Uint256(parse_uint_input(text)?)),
        }
    }

    fn word(&self) -> String {
        match self {
            Param::Address(address) => address_to_word(address),
            Param::Uint256(value) => encode_uint256(*value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Owner,
    NativeBalance,
    TokenBalance,
    DepositToken,
    WithdrawNative,
    WithdrawToken,
    Approve,
    BalanceOf,
    Symbol,
    Decimals,
}

struct MethodSpec {
    method: Method,
    name: &'static str,
    signature: &'static str,
    selector: &'static str,
    inputs: &'static [ParamKind],
}

use ParamKind::{Address as A, Uint256 as U};

const METHODS: [MethodSpec; 10] = [
    MethodSpec {
        method: Method::Owner,
        name: "owner",
        signature: "owner()",
        selector: "0x8da5cb5b",
        inputs: &[],
    },
    MethodSpec {
        method: Method::NativeBalance,
        name: "bnbBalance",
        signature: "bnbBalance()",
        selector: "0x7bb98a68",
        inputs: &[],
    },
    MethodSpec {
        method: Method::TokenBalance,
        name: "tokenBalance",
        signature: "tokenBalance(address)",
        selector: "0xe3ee160e",
        inputs: &[A],
    },
    MethodSpec {
        method: Method::DepositToken,
        name: "depositToken",
        signature: "depositToken(address,uint256)",
        selector: "0x338b5dea",
        inputs: &[A, U],
    },
    MethodSpec {
        method: Method::WithdrawNative,
        name: "withdrawBNB",
        signature: "withdrawBNB(address,uint256)",
        selector: "0xf14210a6",
        inputs: &[A, U],
    },
    MethodSpec {
        method: Method::WithdrawToken,
        name: "withdrawToken",
        signature: "withdrawToken(address,address,uint256)",
        selector: "0x01e33667",
        inputs: &[A, A, U],
    },
    MethodSpec {
        method: Method::Approve,
        name: "approve",
        signature: "approve(address,uint256)",
        selector: "0x095ea7b3",
        inputs: &[A, U],
    },
    MethodSpec {
        method: Method::BalanceOf,
        name: "balanceOf",
        signature: "balanceOf(address)",
        selector: "0x70a08231",
        inputs: &[A],
    },
    MethodSpec {
        method: Method::Symbol,
        name: "symbol",
        signature: "symbol()",
        selector: "0x95d89b41",
        inputs: &[],
    },
    MethodSpec {
        method: Method::Decimals,
        name: "decimals",
        signature: "decimals()",
        selector: "0x313ce567",
        inputs: &[],
    },
];

impl Method {
    pub fn all() -> impl Iterator<Item = Method> {
        METHODS.iter().map(|spec| spec.method)
    }

    fn spec(self) -> &'static MethodSpec {
        let row = match self {
            Method::Owner => 0,
            Method::NativeBalance => 1,
            Method::TokenBalance => 2,
            Method::DepositToken => 3,
            Method::WithdrawNative => 4,
            Method::WithdrawToken => 5,
            Method::Approve => 6,
            Method::BalanceOf => 7,
            Method::Symbol => 8,
            Method::Decimals => 9,
        };
        &METHODS[row]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn signature(self) -> &'static str {
        self.spec().signature
    }

    pub fn selector(self) -> &'static str {
        self.spec().selector
    }

    pub fn inputs(self) -> &'static [ParamKind] {
        self.spec().inputs
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        METHODS
            .iter()
            .find(|spec| spec.name == s)
            .map(|spec| spec.method)
            .ok_or_else(|| AbiError::UnknownMethod(s.to_string()))
    }
}

pub fn encode_call(method: Method, params: &[Param]) -> AbiResult<String> {
    let expected = method.inputs();
    if expected.len() != params.len()
        || expected
            .iter()
            .zip(params)
            .any(|(kind, param)| *kind != param.kind())
    {
        return Err(AbiError::ArgumentMismatch {
            method: method.name(),
            expected: join_kinds(expected.iter().copied()),
            actual: join_kinds(params.iter().map(Param::kind)),
        });
    }

    let mut data = String::with_capacity(10 + params.len() * crate::WORD_HEX_LEN);
    data.push_str(method.selector());
    for param in params {
        data.push_str(&param.word());
    }
    Ok(data)
}

pub fn encode_named(name: &str, params: &[Param]) -> AbiResult<String> {
    encode_call(name.parse()?, params)
}

fn join_kinds(kinds: impl Iterator<Item = ParamKind>) -> String {
    kinds.map(ParamKind::as_str).collect::<Vec<_>>().join(",")
}
