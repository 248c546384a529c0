//! Order-independent content fingerprint
//!
//! Every indexed entity contributes `id ^ hash(text)`. Contributions are
//! combined with XOR, so any order or split into partial builds gives the
//! same total, and folding a contribution twice cancels it.

use std::fmt;
use std::ops::{BitXor, BitXorAssign};

use crate::shared::models::EntityId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    pub const EMPTY: Fingerprint = Fingerprint(0);

    pub fn value(self) -> u64 {
        self.0
    }

    /// Contribution of one indexed entity
    pub fn fold_entity(id: EntityId, text_hash: u64) -> Fingerprint {
        Fingerprint(id ^ text_hash)
    }

    pub fn combine(a: Fingerprint, b: Fingerprint) -> Fingerprint {
        a ^ b
    }

    /// Fold one entity into the running total.
    pub fn add_entity(&mut self, id: EntityId, text: &str) {
        *self ^= Fingerprint::fold_entity(id, text_hash(text));
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl BitXor for Fingerprint {
    type Output = Fingerprint;

    fn bitxor(self, rhs: Fingerprint) -> Fingerprint {
        Fingerprint(self.0 ^ rhs.0)
    }
}

impl BitXorAssign for Fingerprint {
    fn bitxor_assign(&mut self, rhs: Fingerprint) {
        self.0 ^= rhs.0;
    }
}

/// First 8 bytes (little-endian) of the BLAKE3 digest of `text`.
pub fn text_hash(text: &str) -> u64 {
    let digest = blake3::hash(text.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}
