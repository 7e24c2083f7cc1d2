//! Account addresses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 20-byte account address.
///
/// Two addresses are reserved: [`Address::ZERO`] is the null sentinel and is
/// never a valid transfer party, and [`Address::BURN`] is the burn sink that
/// receives the early-sell tax (valid as a recipient only).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The null address (20 zero bytes).
    pub const ZERO: Self = Self([0u8; 20]);

    /// The burn sink: `0x000000000000000000000000000000000000dead`.
    pub const BURN: Self = Self([
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xde, 0xad,
    ]);

    /// Create an address from a byte array.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the null address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
