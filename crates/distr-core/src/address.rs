use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};

use crate::error::{DistrError, Result};

/// Length of derived module addresses.
pub const MODULE_ADDRESS_LEN: usize = 20;

/// Maximum address length; keys carry a single length byte.
pub const MAX_ADDRESS_LEN: usize = 255;

/// Raw account / validator address. Displayed and serialized as lowercase hex.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(Vec<u8>);

impl Address {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(DistrError::EmptyAddress);
        }
        if bytes.len() > MAX_ADDRESS_LEN {
            return Err(DistrError::InvalidAddress(format!(
                "{} bytes exceeds maximum {}",
                bytes.len(),
                MAX_ADDRESS_LEN
            )));
        }
        Ok(Address(bytes))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes =
            hex::decode(s).map_err(|e| DistrError::InvalidAddress(format!("{}: {}", s, e)))?;
        Address::new(bytes)
    }

    /// Deterministic address of a module account: first 20 bytes of
    /// SHA3-256(name).
    pub fn module(name: &str) -> Address {
        let digest = Sha3_256::digest(name.as_bytes());
        Address(digest[..MODULE_ADDRESS_LEN].to_vec())
    }

    /// Address of the module account backing tokenize-share record `id`.
    pub fn tokenize_share_module(id: u64) -> Address {
        Address::module(&format!("tokenizeshare_{}", id))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = DistrError;

    fn from_str(s: &str) -> Result<Self> {
        Address::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
