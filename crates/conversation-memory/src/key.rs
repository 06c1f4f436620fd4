use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Modulus shared by every key scheme. Changing it orphans all stored records.
pub const KEY_MODULUS: u64 = 4_239_047_233_139;

/// Numeric storage address of one user's conversation record.
///
/// Derived from the platform user id and never reversible to it; the key is
/// the only user-identifying value that reaches the object store or the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoryKey(u64);

impl MemoryKey {
    pub fn new(value: u64) -> Self {
        MemoryKey(value % KEY_MODULUS)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MemoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a platform user id is folded into a [`MemoryKey`].
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyScheme {
    /// Sum of Unicode scalar values. Matches records written by the first
    /// deployment of the bot; anagram ids collide.
    CodepointSum,
    /// First 8 bytes of SHA-256, big-endian.
    #[default]
    Sha256,
}

/// Deterministic user id -> memory key mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHasher {
    scheme: KeyScheme,
}

impl IdentityHasher {
    pub fn new(scheme: KeyScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> KeyScheme {
        self.scheme
    }

    pub fn hash(&self, user_id: &str) -> MemoryKey {
        match self.scheme {
            KeyScheme::CodepointSum => {
                let sum = user_id
                    .chars()
                    .fold(0u64, |acc, ch| (acc + ch as u64) % KEY_MODULUS);
                MemoryKey::new(sum)
            }
            KeyScheme::Sha256 => {
                let digest = Sha256::digest(user_id.as_bytes());
                let mut prefix = [0u8; 8];
                prefix.copy_from_slice(&digest[..8]);
                MemoryKey::new(u64::from_be_bytes(prefix))
            }
        }
    }
}
