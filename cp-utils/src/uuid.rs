use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UuidParseError {
    #[error("uuid `{0}` must contain 32 hex digits")]
    Length(String),
    #[error("uuid `{input}` is not valid hex: {source}")]
    Hex {
        input: String,
        #[source]
        source: hex::FromHexError,
    },
}

/// 128-bit identity of an in-world entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityUuid {
    most: u64,
    least: u64,
}

impl EntityUuid {
    pub const fn from_parts(most: u64, least: u64) -> Self {
        Self { most, least }
    }

    pub const fn from_u128(value: u128) -> Self {
        Self {
            most: (value >> 64) as u64,
            least: value as u64,
        }
    }

    pub const fn most_significant(self) -> u64 {
        self.most
    }

    pub const fn least_significant(self) -> u64 {
        self.least
    }

    /// 32-bit identity hash: xor of both halves, then of the upper and lower words.
    /// Every client computes the same value for the same entity.
    pub const fn hash_code(self) -> i32 {
        let folded = self.most ^ self.least;
        ((folded >> 32) as i32) ^ (folded as i32)
    }
}

impl FromStr for EntityUuid {
    type Err = UuidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != '-').collect();
        if digits.len() != 32 {
            return Err(UuidParseError::Length(s.to_string()));
        }
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(&digits, &mut bytes).map_err(|source| UuidParseError::Hex {
            input: s.to_string(),
            source,
        })?;
        Ok(Self::from_u128(u128::from_be_bytes(bytes)))
    }
}

impl fmt::Display for EntityUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(((self.most as u128) << 64 | self.least as u128).to_be_bytes());
        write!(
            f,
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }
}

impl fmt::Debug for EntityUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityUuid({self})")
    }
}
