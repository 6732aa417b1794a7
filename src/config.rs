//! Hub configuration, loaded from JSON. Every section defaults so partial files load;
//! `validate` rejects values the hub cannot honor.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub const DEFAULT_SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 3600;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub authenticator: AuthenticatorConfig,
    pub permit_db: PermitDbConfig,
    pub session_db: SessionDbConfig,
    pub role_group_db: RoleGroupDbConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// "" or "stdout", "stderr", or a file path opened for append.
    pub filename: String,
    /// Filter directive used when RUST_LOG is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { filename: String::new(), level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConnection {
    pub driver: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl: bool,
}

impl DbConnection {
    pub fn memory() -> Self {
        Self { driver: "memory".to_string(), ..Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticatorConfig {
    /// "ldap", "db" or "dummy".
    #[serde(rename = "type")]
    pub kind: String,
    /// LDAP transport: "" (unencrypted), "SSL" or "TLS".
    pub encryption: String,
    pub ldap_host: String,
    pub ldap_port: u16,
    pub db: DbConnection,
    /// Identities and passwords seeded into the dummy authenticator.
    pub identities: BTreeMap<String, String>,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            kind: "dummy".to_string(),
            encryption: String::new(),
            ldap_host: String::new(),
            ldap_port: 389,
            db: DbConnection::default(),
            identities: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermitDbConfig {
    pub db: DbConnection,
}

impl Default for PermitDbConfig {
    fn default() -> Self { Self { db: DbConnection::memory() } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDbConfig {
    pub db: DbConnection,
    /// 0 = unlimited, 1 = a new login invalidates earlier sessions.
    pub max_active_sessions: i64,
    /// 0 = DEFAULT_SESSION_EXPIRY_SECONDS.
    pub session_expiry_seconds: i64,
    /// 0 = unbounded in-memory session cache.
    pub max_cached_sessions: usize,
}

impl Default for SessionDbConfig {
    fn default() -> Self {
        Self { db: DbConnection::memory(), max_active_sessions: 0, session_expiry_seconds: 0, max_cached_sessions: 0 }
    }
}

/// An empty driver means no role group store is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleGroupDbConfig {
    pub db: DbConnection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LdapMode {
    Unencrypted,
    Ssl,
    Tls,
}

impl LdapMode {
    pub fn parse(encryption: &str) -> Option<LdapMode> {
        match encryption.to_ascii_uppercase().as_str() {
            "" => Some(LdapMode::Unencrypted),
            "SSL" => Some(LdapMode::Ssl),
            "TLS" => Some(LdapMode::Tls),
            _ => None,
        }
    }
}

/// How many simultaneous sessions one identity may hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionLimit {
    #[default]
    Unlimited,
    Single,
}

impl TryFrom<i64> for SessionLimit {
    type Error = ConfigError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(SessionLimit::Unlimited),
            1 => Ok(SessionLimit::Single),
            other => Err(ConfigError::Invalid(format!("max_active_sessions must be 0 or 1, got {}", other))),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        debug!(target: "authhub::config", "loaded config from '{}'", path.display());
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Config, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        SessionLimit::try_from(self.session_db.max_active_sessions)?;
        let expiry = self.session_db.session_expiry_seconds;
        if expiry < 0 {
            return Err(ConfigError::Invalid("session_expiry_seconds must be 0 or more".to_string()));
        }
        let representable = chrono::Duration::try_seconds(expiry)
            .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
            .is_some();
        if !representable {
            return Err(ConfigError::Invalid(format!(
                "session_expiry_seconds {} is beyond the representable expiry time",
                expiry
            )));
        }
        if self.authenticator.kind.eq_ignore_ascii_case("ldap") && LdapMode::parse(&self.authenticator.encryption).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown ldap mode '{}'. Recognized modes are TLS, SSL, and empty for unencrypted",
                self.authenticator.encryption
            )));
        }
        Ok(())
    }

    pub fn session_limit(&self) -> SessionLimit {
        SessionLimit::try_from(self.session_db.max_active_sessions).unwrap_or_default()
    }

    /// Values `validate` rejects fall back to the default.
    pub fn session_ttl(&self) -> chrono::Duration {
        let default = chrono::Duration::seconds(DEFAULT_SESSION_EXPIRY_SECONDS);
        match self.session_db.session_expiry_seconds {
            s if s > 0 => chrono::Duration::try_seconds(s).unwrap_or(default),
            _ => default,
        }
    }
}
