use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::SessionStore;
use crate::error::{AuthError, AuthResult};
use crate::identity::{Permit, Token, canonicalize};

/// Session store held in process memory. Expired sessions stay until `purge_expired`.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Token>>,
}

impl MemorySessionStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.sessions.read().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Drop sessions that expired before `now`; returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, t| !t.is_expired_at(now));
        before - sessions.len()
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self, key: &str) -> AuthResult<Token> {
        self.sessions.read().get(key).cloned().ok_or_else(AuthError::invalid_session)
    }

    fn write(&self, key: &str, token: &Token) -> AuthResult<()> {
        self.sessions.write().insert(key.to_string(), token.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> AuthResult<()> {
        self.sessions.write().remove(key);
        Ok(())
    }

    fn invalidate_for_identity(&self, identity: &str) -> AuthResult<()> {
        let canon = canonicalize(identity);
        self.sessions.write().retain(|_, t| canonicalize(&t.identity) != canon);
        Ok(())
    }

    fn permit_changed(&self, identity: &str, permit: &Permit) -> AuthResult<()> {
        let canon = canonicalize(identity);
        for t in self.sessions.write().values_mut() {
            if canonicalize(&t.identity) == canon {
                t.permit = permit.clone();
            }
        }
        Ok(())
    }

    fn close(&self) {}
}
