//! Identity verification capability.
//! The hub always talks to a `SanitizingAuthenticator`, which screens obviously bad input
//! before any concrete backend (LDAP, SQL, in-memory) sees it.

mod memory;

use std::sync::Arc;

use tracing::debug;

use crate::error::{AuthError, AuthResult};

pub use memory::MemoryAuthenticator;

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, identity: &str, password: &str) -> AuthResult<()>;
    fn set_password(&self, identity: &str, password: &str) -> AuthResult<()>;
    fn create_identity(&self, identity: &str, password: &str) -> AuthResult<()>;
    fn list_identities(&self) -> AuthResult<Vec<String>>;
    fn close(&self);
}

/// Screens input before delegating. Identities are passed through with their original
/// casing; canonicalization is the caller's concern for its own lookup keys.
pub struct SanitizingAuthenticator {
    backend: Arc<dyn Authenticator>,
}

impl SanitizingAuthenticator {
    pub fn new(backend: Arc<dyn Authenticator>) -> Self { Self { backend } }

    pub fn backend(&self) -> &Arc<dyn Authenticator> { &self.backend }
}

fn check_identity(identity: &str) -> AuthResult<()> {
    if identity.trim().is_empty() {
        return Err(AuthError::identity_empty());
    }
    Ok(())
}

impl Authenticator for SanitizingAuthenticator {
    fn authenticate(&self, identity: &str, password: &str) -> AuthResult<()> {
        check_identity(identity)?;
        // An empty password is an anonymous bind to some directory servers.
        if password.is_empty() {
            debug!(target: "authhub::auth", "rejecting empty password for '{}'", identity);
            return Err(AuthError::invalid_password(identity));
        }
        self.backend.authenticate(identity, password)
    }

    fn set_password(&self, identity: &str, password: &str) -> AuthResult<()> {
        check_identity(identity)?;
        self.backend.set_password(identity, password)
    }

    fn create_identity(&self, identity: &str, password: &str) -> AuthResult<()> {
        check_identity(identity)?;
        self.backend.create_identity(identity, password)
    }

    fn list_identities(&self) -> AuthResult<Vec<String>> {
        self.backend.list_identities()
    }

    fn close(&self) {
        self.backend.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use parking_lot::Mutex;

    /// Records every call that reaches the backend.
    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<String>>,
    }

    impl Authenticator for Recording {
        fn authenticate(&self, identity: &str, _password: &str) -> AuthResult<()> {
            self.calls.lock().push(format!("authenticate {}", identity));
            Ok(())
        }
        fn set_password(&self, identity: &str, _password: &str) -> AuthResult<()> {
            self.calls.lock().push(format!("set_password {}", identity));
            Ok(())
        }
        fn create_identity(&self, identity: &str, _password: &str) -> AuthResult<()> {
            self.calls.lock().push(format!("create_identity {}", identity));
            Ok(())
        }
        fn list_identities(&self) -> AuthResult<Vec<String>> { Ok(vec!["x".into()]) }
        fn close(&self) { self.calls.lock().push("close".into()); }
    }

    #[test]
    fn empty_identity_never_reaches_backend() {
        let backend = Arc::new(Recording::default());
        let auth = SanitizingAuthenticator::new(backend.clone());
        assert_eq!(auth.authenticate("", "pw").unwrap_err().kind(), ErrorKind::IdentityEmpty);
        assert_eq!(auth.set_password("  ", "pw").unwrap_err().kind(), ErrorKind::IdentityEmpty);
        assert_eq!(auth.create_identity("", "pw").unwrap_err().kind(), ErrorKind::IdentityEmpty);
        assert!(backend.calls.lock().is_empty());
    }

    #[test]
    fn empty_password_is_rejected_before_backend() {
        let backend = Arc::new(Recording::default());
        let auth = SanitizingAuthenticator::new(backend.clone());
        assert_eq!(auth.authenticate("alice", "").unwrap_err().kind(), ErrorKind::InvalidPassword);
        assert!(backend.calls.lock().is_empty());
    }

    #[test]
    fn identity_casing_is_preserved_when_delegating() {
        let backend = Arc::new(Recording::default());
        let auth = SanitizingAuthenticator::new(backend.clone());
        auth.authenticate("Alice", "pw").unwrap();
        auth.close();
        assert_eq!(*backend.calls.lock(), vec!["authenticate Alice".to_string(), "close".to_string()]);
    }
}
