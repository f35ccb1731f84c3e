use crate::error::{Result, StoreError};
use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;

/// Keys are SHA-1 digests of the stored value.
pub const KEY_SIZE: usize = 20;

/// Immutable content-derived identifier of a stored value.
///
/// A `Key` is never chosen by a caller; it is either derived from a payload
/// or parsed back from its lowercase hex form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key([u8; KEY_SIZE]);

impl Key {
    /// Compute the key for `value`.
    pub fn derive(value: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(value);
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        let raw = hex::decode(text).map_err(|e| StoreError::InvalidKey(e.to_string()))?;
        let bytes: [u8; KEY_SIZE] = raw.try_into().map_err(|raw: Vec<u8>| {
            StoreError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_SIZE,
                raw.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.to_hex())
    }
}

impl FromStr for Key {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}
