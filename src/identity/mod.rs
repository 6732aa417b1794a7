//! Identity primitives shared by every layer of the hub: canonical identities, opaque
//! permits, authentication tokens, and session key generation.
//! Keep the public surface thin and split implementation across sub-modules.

mod permit;
mod token;
mod session_key;

pub use permit::Permit;
pub use token::{Token, far_future};
pub use session_key::{generate_session_key, SESSION_KEY_LENGTH, SESSION_KEY_CORPUS};

/// Canonical form of an identity. Two identities are the same principal when their
/// canonical forms are equal, so "Bob@enterprise.com" and "bob@enterprise.com" match.
pub fn canonicalize(identity: &str) -> String {
    identity.to_lowercase()
}

/// True when both identities name the same principal.
pub fn same_identity(a: &str, b: &str) -> bool {
    canonicalize(a) == canonicalize(b)
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod identity_tests;
