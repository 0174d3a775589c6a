//! Node address type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// An opaque node identifier.
///
/// Addresses are compared by the value of their big-endian byte encoding,
/// which is exactly the numeric order of the inner identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(u64);

impl Address {
    /// The textual prefix used by [`fmt::Display`] and [`FromStr`].
    pub const PREFIX: &'static str = "node_";

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Return the raw identifier.
    pub fn id(&self) -> u64 {
        self.0
    }

    /// Big-endian byte encoding of the address.
    pub fn to_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix(Self::PREFIX).unwrap_or(s);
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| TypesError::InvalidAddress(s.to_string()))
    }
}

impl From<u64> for Address {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_byte_order() {
        let a = Address::new(1);
        let b = Address::new(256);
        assert!(a < b);
        assert!(a.to_bytes() < b.to_bytes());
    }

    #[test]
    fn display_and_parse() {
        let addr = Address::new(42);
        assert_eq!(addr.to_string(), "node_42");
        assert_eq!("node_42".parse::<Address>().unwrap(), addr);
        assert_eq!("42".parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "node_x".parse::<Address>().unwrap_err();
        assert!(matches!(err, TypesError::InvalidAddress(_)));
    }
}
