use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Opaque binary authorization payload. Its meaning belongs to the application; this
/// layer only copies, compares, and serializes the bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permit {
    roles: Vec<u8>,
}

impl Permit {
    pub fn new<B: Into<Vec<u8>>>(roles: B) -> Self {
        Self { roles: roles.into() }
    }

    pub fn roles(&self) -> &[u8] { &self.roles }

    pub fn into_roles(self) -> Vec<u8> { self.roles }

    pub fn is_empty(&self) -> bool { self.roles.is_empty() }

    /// Standard base64 of the raw bytes.
    pub fn serialize(&self) -> String {
        STANDARD.encode(&self.roles)
    }

    pub fn deserialize(encoded: &str) -> Result<Permit, base64::DecodeError> {
        let roles = STANDARD.decode(encoded)?;
        Ok(Permit { roles })
    }
}

impl From<Vec<u8>> for Permit {
    fn from(roles: Vec<u8>) -> Self { Permit { roles } }
}

impl From<&[u8]> for Permit {
    fn from(roles: &[u8]) -> Self { Permit { roles: roles.to_vec() } }
}
