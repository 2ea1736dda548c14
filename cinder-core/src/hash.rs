use crate::U256;
use hex;
use std::{convert::TryFrom, fmt, str::FromStr};

/// A block hash read as a big-endian 256-bit number, which is how it is
/// compared against a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BlockHash(pub U256);

impl serde::Serialize for BlockHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = self.to_string();
        serializer.serialize_str(&s)
    }
}

impl<'de> serde::Deserialize<'de> for BlockHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BlockHash::try_from(s.as_str()).map_err(|e| {
            serde::de::Error::custom(format!("Failed to deserialize hash from hex string: {}", e))
        })
    }
}

impl BlockHash {
    pub fn zero() -> Self {
        BlockHash(U256::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn meets_target(&self, target: &U256) -> bool {
        self.0 <= *target
    }

    pub fn as_u256(&self) -> &U256 {
        &self.0
    }

    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_big_endian()
    }
}

impl From<U256> for BlockHash {
    fn from(value: U256) -> Self {
        BlockHash(value)
    }
}

impl From<BlockHash> for String {
    fn from(hash: BlockHash) -> Self {
        hex::encode(hash.as_bytes())
    }
}

impl TryFrom<&str> for BlockHash {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        u256_from_hex(s).map(BlockHash)
    }
}

impl FromStr for BlockHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockHash::try_from(s)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.as_bytes()))
    }
}

/// Parses exactly 64 hex digits, most significant byte first.
pub fn u256_from_hex(s: &str) -> Result<U256, String> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|e| e.to_string())?;

    if bytes.len() != 32 {
        return Err(format!(
            "Invalid hex string length: expected 64 chars (32 bytes), found {} bytes",
            bytes.len()
        ));
    }

    Ok(U256::from_big_endian(&bytes))
}

pub fn u256_to_hex(value: &U256) -> String {
    hex::encode(value.to_big_endian())
}

/// `#[serde(with = "hex_u256")]` for 256-bit values kept as 64 hex digits.
pub mod hex_u256 {
    use super::{u256_from_hex, u256_to_hex};
    use crate::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&u256_to_hex(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        u256_from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";

    #[test]
    fn test_hex_round_trip() {
        let hash: BlockHash = GENESIS.parse().unwrap();
        assert_eq!(hash.to_string(), GENESIS);
        assert_eq!(String::from(hash), GENESIS);
        assert_eq!(hash.as_bytes()[0..3], [0x00, 0x00, 0x00]);
        assert_eq!(hash.as_bytes()[31], 0x6f);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(BlockHash::try_from("1234").is_err());
        assert!(BlockHash::try_from("zz").is_err());
        assert!(BlockHash::try_from(&GENESIS[2..]).is_err());
    }

    #[test]
    fn test_meets_target() {
        let hash: BlockHash = GENESIS.parse().unwrap();
        let target = crate::Compact(0x1d00ffff).decode().value;
        assert!(hash.meets_target(&target));
        assert!(hash.meets_target(hash.as_u256()));
        assert!(!hash.meets_target(&(hash.0 - U256::one())));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let hash: BlockHash = GENESIS.parse().unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", GENESIS));
        let back: BlockHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
