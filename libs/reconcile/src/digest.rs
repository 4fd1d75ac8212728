//! Content digests of address sets.
//!
//! Used to tell at a glance (in logs) whether desired or actual membership
//! changed between two daemon cycles.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::AddressSet;

/// Digest of an [`AddressSet`], independent of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateDigest(String);

impl StateDigest {
    pub fn of(addresses: &AddressSet) -> Self {
        let mut hasher = Sha256::new();
        for address in addresses.iter() {
            hasher.update(address.as_bytes());
            hasher.update(b"\n");
        }
        let result = hasher.finalize();
        Self(format!("sha256:{}", hex::encode(&result[..16])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
