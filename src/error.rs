//! Hub error model.
//! Every runtime error carries one of a fixed set of base kinds followed by a free-form
//! detail, so callers that only see the rendered message can still classify it by prefix.

use std::fmt::{Display, Formatter};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connect,
    Unsupported,
    IdentityAuthNotFound,
    IdentityPermitNotFound,
    IdentityEmpty,
    IdentityExists,
    InvalidPassword,
    InvalidSessionToken,
    RoleGroupNotFound,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::Connect,
        ErrorKind::Unsupported,
        ErrorKind::IdentityAuthNotFound,
        ErrorKind::IdentityPermitNotFound,
        ErrorKind::IdentityEmpty,
        ErrorKind::IdentityExists,
        ErrorKind::InvalidPassword,
        ErrorKind::InvalidSessionToken,
        ErrorKind::RoleGroupNotFound,
    ];

    /// Base description. None of these may be a prefix of another.
    pub fn base(&self) -> &'static str {
        match self {
            ErrorKind::Connect => "Connect failed",
            ErrorKind::Unsupported => "Unsupported operation",
            ErrorKind::IdentityAuthNotFound => "Identity authorization not found",
            ErrorKind::IdentityPermitNotFound => "Identity permit not found",
            ErrorKind::IdentityEmpty => "Identity may not be empty",
            ErrorKind::IdentityExists => "Identity already exists",
            ErrorKind::InvalidPassword => "Invalid password",
            ErrorKind::InvalidSessionToken => "Invalid session token",
            ErrorKind::RoleGroupNotFound => "Role group not found",
        }
    }

    /// Recover the kind from a rendered error message.
    pub fn classify(message: &str) -> Option<ErrorKind> {
        Self::ALL.iter().copied().find(|k| message.starts_with(k.base()))
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.base())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    kind: ErrorKind,
    detail: String,
}

impl AuthError {
    pub fn new<S: Into<String>>(kind: ErrorKind, detail: S) -> Self {
        Self { kind, detail: detail.into() }
    }

    pub fn bare(kind: ErrorKind) -> Self { Self { kind, detail: String::new() } }

    pub fn connect<S: Into<String>>(detail: S) -> Self { Self::new(ErrorKind::Connect, detail) }
    pub fn unsupported<S: Into<String>>(detail: S) -> Self { Self::new(ErrorKind::Unsupported, detail) }
    pub fn auth_not_found<S: Into<String>>(detail: S) -> Self { Self::new(ErrorKind::IdentityAuthNotFound, detail) }
    pub fn permit_not_found<S: Into<String>>(detail: S) -> Self { Self::new(ErrorKind::IdentityPermitNotFound, detail) }
    pub fn identity_empty() -> Self { Self::bare(ErrorKind::IdentityEmpty) }
    pub fn identity_exists<S: Into<String>>(detail: S) -> Self { Self::new(ErrorKind::IdentityExists, detail) }
    pub fn invalid_password<S: Into<String>>(detail: S) -> Self { Self::new(ErrorKind::InvalidPassword, detail) }
    pub fn invalid_session() -> Self { Self::bare(ErrorKind::InvalidSessionToken) }
    pub fn role_group_not_found<S: Into<String>>(detail: S) -> Self { Self::new(ErrorKind::RoleGroupNotFound, detail) }

    pub fn kind(&self) -> ErrorKind { self.kind }

    pub fn detail(&self) -> &str { &self.detail }

    pub fn is(&self, kind: ErrorKind) -> bool { self.kind == kind }

    /// Prefix the detail with the calling operation. The kind is preserved.
    pub fn context<S: AsRef<str>>(mut self, op: S) -> Self {
        self.detail = if self.detail.is_empty() {
            op.as_ref().to_string()
        } else {
            format!("{}: {}", op.as_ref(), self.detail)
        };
        self
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.detail)
        }
    }
}

impl std::error::Error for AuthError {}

pub type AuthResult<T> = Result<T, AuthError>;

/// Startup and configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("error reading config file '{path}': {source}")]
    Io { path: String, source: std::io::Error },
    #[error("error parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("error opening log file '{path}': {source}")]
    LogFile { path: String, source: std::io::Error },
    #[error("error creating {component}: {source}")]
    Backend { component: &'static str, source: AuthError },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
