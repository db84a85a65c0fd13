use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::IdError;

macro_rules! prefixed_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn parse(s: &str) -> Result<Self, IdError> {
                let s = s.trim();
                if s.is_empty() {
                    return Err(IdError::Empty($kind));
                }
                if !s.starts_with(Self::PREFIX) || s.len() == Self::PREFIX.len() {
                    return Err(IdError::BadPrefix {
                        kind: $kind,
                        prefix: Self::PREFIX,
                        found: s.to_string(),
                    });
                }
                Ok(Self(s.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(&s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

prefixed_id!(
    /// Ledger account, e.g. the player's wallet or the treasury.
    AccountId,
    "account",
    "ak_"
);

prefixed_id!(
    /// Deployed contract instance.
    ContractId,
    "contract",
    "ct_"
);
