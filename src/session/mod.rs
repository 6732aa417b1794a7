//! Session persistence and the in-memory cache the hub reads through.

mod cache;
mod store;

use crate::error::AuthResult;
use crate::identity::{Permit, Token};

pub use cache::{CacheStats, SessionCache};
pub use store::MemorySessionStore;

/// Persistent session key → Token mapping.
pub trait SessionStore: Send + Sync {
    /// Fails with `InvalidSessionToken` when the key is unknown.
    fn read(&self, key: &str) -> AuthResult<Token>;
    fn write(&self, key: &str, token: &Token) -> AuthResult<()>;
    /// Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> AuthResult<()>;
    /// Remove every session whose identity canonicalizes equal to `identity`.
    fn invalidate_for_identity(&self, identity: &str) -> AuthResult<()>;
    /// Replace the permit of every session belonging to `identity`, keeping the keys.
    fn permit_changed(&self, identity: &str, permit: &Permit) -> AuthResult<()>;
    fn close(&self);
}
