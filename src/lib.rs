//! authhub: verifies identities against pluggable backends, issues session keys bound to
//! opaque permits, and serves fast session lookups.

pub mod error;
pub mod identity;
pub mod stats;
pub mod authenticator;
pub mod permit_store;
pub mod session;
pub mod role_group;
pub mod config;
pub mod logging;
pub mod backends;
pub mod hub;
pub mod console;

pub use error::{AuthError, AuthResult, ConfigError, ErrorKind};
pub use hub::Hub;
pub use identity::{Permit, Token, canonicalize};
