use std::collections::HashMap;

use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use parking_lot::RwLock;
use password_hash::{PasswordHash, SaltString};

use super::Authenticator;
use crate::error::{AuthError, AuthResult};
use crate::identity::canonicalize;

struct Entry {
    identity: String,
    phc: String,
}

/// In-memory authenticator for tests and bootstrap. Passwords are kept as Argon2 PHC
/// strings keyed by canonical identity.
pub struct MemoryAuthenticator {
    entries: RwLock<HashMap<String, Entry>>,
    argon2: Argon2<'static>,
}

impl Default for MemoryAuthenticator {
    fn default() -> Self { Self::new() }
}

impl MemoryAuthenticator {
    pub fn new() -> Self {
        // Light parameters: this backend holds test and bootstrap identities only.
        let params = Params::new(4096, 1, 1, None).unwrap_or_default();
        Self {
            entries: RwLock::new(HashMap::new()),
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Seed identities with their passwords.
    pub fn with_identities<'a, I>(identities: I) -> AuthResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let auth = Self::new();
        for (identity, password) in identities {
            auth.create_identity(identity, password)?;
        }
        Ok(auth)
    }

    fn hash_password(&self, password: &str) -> AuthResult<String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| AuthError::connect(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::connect(e.to_string()))?;
        let phc = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::connect(e.to_string()))?
            .to_string();
        Ok(phc)
    }

    fn verify_password(&self, phc: &str, password: &str) -> bool {
        match PasswordHash::new(phc) {
            Ok(parsed) => self.argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

impl Authenticator for MemoryAuthenticator {
    fn authenticate(&self, identity: &str, password: &str) -> AuthResult<()> {
        let phc = {
            let entries = self.entries.read();
            match entries.get(&canonicalize(identity)) {
                Some(e) => e.phc.clone(),
                None => return Err(AuthError::auth_not_found(identity)),
            }
        };
        if self.verify_password(&phc, password) {
            Ok(())
        } else {
            Err(AuthError::invalid_password(identity))
        }
    }

    fn set_password(&self, identity: &str, password: &str) -> AuthResult<()> {
        let phc = self.hash_password(password)?;
        let mut entries = self.entries.write();
        match entries.get_mut(&canonicalize(identity)) {
            Some(e) => {
                e.phc = phc;
                Ok(())
            }
            None => Err(AuthError::auth_not_found(identity)),
        }
    }

    fn create_identity(&self, identity: &str, password: &str) -> AuthResult<()> {
        let phc = self.hash_password(password)?;
        let key = canonicalize(identity);
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(AuthError::identity_exists(identity));
        }
        entries.insert(key, Entry { identity: identity.to_string(), phc });
        Ok(())
    }

    fn list_identities(&self) -> AuthResult<Vec<String>> {
        let mut out: Vec<String> = self.entries.read().values().map(|e| e.identity.clone()).collect();
        out.sort();
        Ok(out)
    }

    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn create_and_authenticate_case_insensitively() {
        let auth = MemoryAuthenticator::with_identities([("Alice", "secret")]).unwrap();
        assert!(auth.authenticate("alice", "secret").is_ok());
        assert!(auth.authenticate("ALICE", "secret").is_ok());
        assert_eq!(auth.authenticate("alice", "wrong").unwrap_err().kind(), ErrorKind::InvalidPassword);
        assert_eq!(auth.authenticate("bob", "secret").unwrap_err().kind(), ErrorKind::IdentityAuthNotFound);
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let auth = MemoryAuthenticator::new();
        auth.create_identity("bob", "a").unwrap();
        assert_eq!(auth.create_identity("BOB", "b").unwrap_err().kind(), ErrorKind::IdentityExists);
    }

    #[test]
    fn set_password_replaces_credential() {
        let auth = MemoryAuthenticator::with_identities([("carol", "old")]).unwrap();
        auth.set_password("Carol", "new").unwrap();
        assert!(auth.authenticate("carol", "new").is_ok());
        assert!(auth.authenticate("carol", "old").is_err());
        assert_eq!(auth.set_password("nobody", "x").unwrap_err().kind(), ErrorKind::IdentityAuthNotFound);
    }

    #[test]
    fn passwords_are_not_stored_in_plaintext() {
        let auth = MemoryAuthenticator::with_identities([("dave", "hunter2")]).unwrap();
        let entries = auth.entries.read();
        let e = entries.get("dave").unwrap();
        assert!(e.phc.starts_with("$argon2id$"));
        assert!(!e.phc.contains("hunter2"));
    }

    #[test]
    fn identities_listed_sorted_with_original_casing() {
        let auth = MemoryAuthenticator::with_identities([("zed", "1"), ("Amy", "2")]).unwrap();
        assert_eq!(auth.list_identities().unwrap(), vec!["Amy".to_string(), "zed".to_string()]);
    }
}
