use crate::U256;
use std::{fmt, str::FromStr};

const SIGN_BIT: u32 = 0x0080_0000;
const MANTISSA_MASK: u32 = 0x007f_ffff;

/// Packed 32-bit form of a 256-bit target: one size byte followed by a
/// three byte mantissa whose top bit doubles as a sign flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Compact(pub u32);

/// Result of unpacking a [`Compact`]. `value` is zero whenever either flag is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedTarget {
    pub value: U256,
    pub negative: bool,
    pub overflow: bool,
}

impl DecodedTarget {
    /// The usable target, if the encoding was well formed and nonzero.
    pub fn target(&self) -> Option<U256> {
        if self.negative || self.overflow || self.value.is_zero() {
            None
        } else {
            Some(self.value)
        }
    }
}

impl Compact {
    pub fn decode(self) -> DecodedTarget {
        let size = self.0 >> 24;
        let mut word = self.0 & MANTISSA_MASK;

        let negative = word != 0 && (self.0 & SIGN_BIT) != 0;
        let overflow = word != 0
            && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));

        if negative || overflow {
            return DecodedTarget {
                value: U256::zero(),
                negative,
                overflow,
            };
        }

        let value = if size <= 3 {
            word >>= 8 * (3 - size);
            U256::from(word)
        } else {
            U256::from(word) << (8 * (size - 3) as usize)
        };

        DecodedTarget {
            value,
            negative,
            overflow,
        }
    }

    pub fn to_target(self) -> Option<U256> {
        self.decode().target()
    }

    pub fn from_target(value: &U256) -> Self {
        Self::from_signed_target(value, false)
    }

    /// Encodes `value`, setting the sign bit when `negative` and the mantissa is nonzero.
    pub fn from_signed_target(value: &U256, negative: bool) -> Self {
        let mut size = (value.bits() + 7) / 8;
        let mut compact = if size <= 3 {
            (value.low_u64() << (8 * (3 - size))) as u32
        } else {
            (*value >> (8 * (size - 3))).low_u64() as u32
        };

        // The mantissa is signed, so a set top bit would read back as negative.
        if compact & SIGN_BIT != 0 {
            compact >>= 8;
            size += 1;
        }

        compact |= (size as u32) << 24;
        if negative && (compact & MANTISSA_MASK) != 0 {
            compact |= SIGN_BIT;
        }

        Compact(compact)
    }
}

impl From<u32> for Compact {
    fn from(bits: u32) -> Self {
        Compact(bits)
    }
}

impl From<Compact> for u32 {
    fn from(compact: Compact) -> Self {
        compact.0
    }
}

impl fmt::Display for Compact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl fmt::LowerHex for Compact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl FromStr for Compact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u32::from_str_radix(digits, 16)
            .map(Compact)
            .map_err(|e| format!("Invalid compact target {:?}: {}", s, e))
    }
}

impl serde::Serialize for Compact {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Compact {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
