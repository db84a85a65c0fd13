use core::fmt;
use core::str::FromStr;
use primitive_types::U256;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::DecodeError;

/// 2^53, the largest integer below which every integer is an exact `f64`.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Currency quantity in the ledger's smallest unit (aettos).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(U256);

impl Amount {
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    pub const fn from_u256(value: U256) -> Self {
        Self(value)
    }

    pub const fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Coerces a decoded call result (or configuration value) into an amount.
    ///
    /// Decoders hand amounts back either as JSON integers or as decimal strings
    /// once they outgrow a double, so both are accepted. Floats are accepted
    /// only up to 2^53. `label` names the
    /// amount in error messages.
    pub fn from_value(value: &Value, label: &'static str) -> Result<Self, DecodeError> {
        let invalid = || DecodeError::InvalidAmount {
            label,
            found: value.to_string(),
        };

        match value {
            Value::Null => Err(DecodeError::Missing(label)),
            Value::Number(number) => {
                if let Some(n) = number.as_u64() {
                    return Ok(Self::from(n));
                }
                if number.is_i64() {
                    return Err(invalid());
                }
                number.as_f64().and_then(Self::from_exact_float).ok_or_else(invalid)
            }
            Value::String(s) => s.trim().parse().map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    /// Accepts a float only when it is a whole number a double holds exactly.
    /// Integers past 2^53 that reach us as floats have already been rounded.
    fn from_exact_float(f: f64) -> Option<Self> {
        if !f.is_finite() || f < 0.0 || f.fract() != 0.0 || f > MAX_EXACT_FLOAT {
            return None;
        }
        Some(Self::from(f as u64))
    }

    pub fn to_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl FromStr for Amount {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DecodeError::InvalidAmount {
            label: "amount",
            found: s.to_string(),
        };
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        U256::from_dec_str(s).map(Self).map_err(|_| invalid())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer, an exact whole float or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        u64::try_from(v)
            .map(Amount::from)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Amount::from_exact_float(v).ok_or_else(|| E::invalid_value(de::Unexpected::Float(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.trim()
            .parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}
