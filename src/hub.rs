//! The hub of authentication that callers interact with.
//!
//! `Hub` composes an authenticator, a permit store, a session cache and an optional role
//! group cache, and owns the session policy (time-to-live and active sessions per
//! identity). Every public method is callable from many threads at once.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, Utc};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::authenticator::{Authenticator, SanitizingAuthenticator};
use crate::backends::BackendRegistry;
use crate::config::{Config, DEFAULT_SESSION_EXPIRY_SECONDS, SessionLimit};
use crate::error::{AuthError, AuthResult, ConfigError, ErrorKind};
use crate::identity::{Permit, Token, canonicalize, far_future, generate_session_key};
use crate::logging::LogSink;
use crate::permit_store::PermitStore;
use crate::role_group::{RoleGroupCache, RoleGroupStore};
use crate::session::{SessionCache, SessionStore};
use crate::stats::Stats;

const LOGIN_STRIPES: usize = 16;

pub struct Hub {
    authenticator: SanitizingAuthenticator,
    permits: Arc<dyn PermitStore>,
    sessions: SessionCache,
    role_groups: Option<RoleGroupCache>,
    log_sink: Option<LogSink>,
    stats: Stats,
    session_limit: SessionLimit,
    session_ttl: Duration,
    // Serializes invalidate-then-write per identity when only one session is allowed.
    login_locks: [Mutex<()>; LOGIN_STRIPES],
    closed: AtomicBool,
}

/// Backends opened so far during `Hub::from_config`, closed in reverse if a later step fails.
struct Startup {
    sink: LogSink,
    authenticator: Option<Arc<dyn Authenticator>>,
    permits: Option<Arc<dyn PermitStore>>,
    sessions: Option<Arc<dyn SessionStore>>,
}

impl Startup {
    fn abort(self, component: &'static str, source: AuthError) -> ConfigError {
        error!(target: "authhub::hub", "error initializing {}: {}", component, source);
        if let Some(s) = self.sessions { s.close(); }
        if let Some(p) = self.permits { p.close(); }
        if let Some(a) = self.authenticator { a.close(); }
        self.sink.release();
        ConfigError::Backend { component, source }
    }
}

impl Hub {
    /// Compose a hub from already-opened backends. `role_groups` may be absent.
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        permits: Arc<dyn PermitStore>,
        sessions: Arc<dyn SessionStore>,
        role_groups: Option<Arc<dyn RoleGroupStore>>,
    ) -> Hub {
        let hub = Hub {
            authenticator: SanitizingAuthenticator::new(authenticator),
            permits,
            sessions: SessionCache::new(sessions, 0),
            role_groups: role_groups.map(RoleGroupCache::new),
            log_sink: None,
            stats: Stats::new(),
            session_limit: SessionLimit::Unlimited,
            session_ttl: Duration::seconds(DEFAULT_SESSION_EXPIRY_SECONDS),
            login_locks: std::array::from_fn(|_| Mutex::new(())),
            closed: AtomicBool::new(false),
        };
        info!(target: "authhub::hub", "hub started");
        hub
    }

    /// Validate `config`, open the log sink and every configured backend, and compose
    /// them. If any step fails, everything opened so far is closed before returning.
    pub fn from_config(config: &Config, registry: &BackendRegistry) -> Result<Hub, ConfigError> {
        config.validate()?;
        let sink = LogSink::open(&config.log)?;
        sink.install(&config.log.level);

        let mut startup = Startup { sink, authenticator: None, permits: None, sessions: None };

        let authenticator = match registry.create_authenticator(&config.authenticator) {
            Ok(a) => a,
            Err(e) => return Err(startup.abort("authenticator", e)),
        };
        startup.authenticator = Some(authenticator.clone());

        let permits = match registry.create_permit_store(&config.permit_db.db) {
            Ok(p) => p,
            Err(e) => return Err(startup.abort("permit store", e)),
        };
        startup.permits = Some(permits.clone());

        let sessions = match registry.create_session_store(&config.session_db.db) {
            Ok(s) => s,
            Err(e) => return Err(startup.abort("session store", e)),
        };
        startup.sessions = Some(sessions.clone());

        let role_groups = match registry.create_role_group_store(&config.role_group_db.db) {
            Ok(r) => r,
            Err(e) => return Err(startup.abort("role group store", e)),
        };

        let mut hub = Hub::new(authenticator, permits, sessions, role_groups)
            .with_session_limit(config.session_limit())
            .with_session_ttl(config.session_ttl());
        hub.sessions.set_max_sessions(config.session_db.max_cached_sessions);
        hub.log_sink = Some(startup.sink);
        Ok(hub)
    }

    pub fn with_session_limit(mut self, limit: SessionLimit) -> Self {
        self.session_limit = limit;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn session_limit(&self) -> SessionLimit { self.session_limit }

    pub fn session_ttl(&self) -> Duration { self.session_ttl }

    pub fn stats(&self) -> &Stats { &self.stats }

    /// Diagnostics and tuning for the session cache.
    pub fn session_cache(&self) -> &SessionCache { &self.sessions }

    pub fn set_session_cache_size(&self, max_sessions: usize) {
        self.sessions.set_max_sessions(max_sessions);
    }

    /// Role group lookups, when a role group store was configured.
    pub fn role_groups(&self) -> Option<&RoleGroupCache> { self.role_groups.as_ref() }

    fn ensure_open(&self) -> AuthResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AuthError::unsupported("hub is closed"));
        }
        Ok(())
    }

    fn login_lock(&self, identity: &str) -> &Mutex<()> {
        let mut h = DefaultHasher::new();
        canonicalize(identity).hash(&mut h);
        &self.login_locks[(h.finish() as usize) % LOGIN_STRIPES]
    }

    /// Look up the token behind a session key (typically a cookie value). Expired sessions
    /// are rejected even if the cache or store has not purged them yet.
    pub fn get_token_from_session(&self, session_key: &str) -> AuthResult<Token> {
        self.ensure_open()?;
        match self.sessions.read(session_key) {
            Ok(token) if token.is_expired() => {
                self.stats.increment_expired_session_key();
                Err(AuthError::invalid_session())
            }
            Ok(token) => Ok(token),
            // Store failures count as invalid keys too.
            Err(e) => {
                self.stats.increment_invalid_session_key();
                if e.is(ErrorKind::InvalidSessionToken) {
                    return Err(e);
                }
                warn!(target: "authhub::hub", "session read failed: {}", e);
                Err(e.context("get token from session"))
            }
        }
    }

    /// Once-off authentication. Nothing is written to the session cache; the token carries
    /// the far-future expiry.
    pub fn get_token_from_identity_password(&self, identity: &str, password: &str) -> AuthResult<Token> {
        self.ensure_open()?;
        // Empty identities are common and would flood the logs.
        if identity.is_empty() {
            self.stats.increment_empty_identities();
            return Err(AuthError::identity_empty());
        }
        if let Err(e) = self.authenticator.authenticate(identity, password) {
            self.count_auth_failure(&e);
            info!(target: "authhub::hub", "once-off auth authentication failed ({}) ({})", identity, e);
            return Err(e.context(format!("once-off auth ({})", identity)));
        }
        let permit = self.permits.get_permit(identity).map_err(|e| {
            info!(target: "authhub::hub", "once-off auth get permit failed ({}) ({})", identity, e);
            e.context(format!("once-off auth ({})", identity))
        })?;
        self.stats.increment_good_once_off_auth();
        info!(target: "authhub::hub", "once-off auth successful ({})", identity);
        Ok(Token::new(canonicalize(identity), far_future(), permit))
    }

    fn count_auth_failure(&self, e: &AuthError) {
        if e.is(ErrorKind::IdentityEmpty) {
            self.stats.increment_empty_identities();
        } else {
            self.stats.increment_invalid_passwords();
        }
    }

    /// Create a new session. Returns the session key, which the caller hands to the client
    /// (typically as a cookie), and the token stored behind it. Not transactional: an
    /// invalidation that already happened is not rolled back if a later step fails.
    pub fn login(&self, identity: &str, password: &str) -> AuthResult<(String, Token)> {
        self.ensure_open()?;
        let op = || format!("login ({})", identity);
        if let Err(e) = self.authenticator.authenticate(identity, password) {
            self.count_auth_failure(&e);
            info!(target: "authhub::hub", "login authentication failed ({}) ({})", identity, e);
            return Err(e.context(op()));
        }
        info!(target: "authhub::hub", "login authentication success ({})", identity);

        let permit = self.permits.get_permit(identity).map_err(|e| {
            info!(target: "authhub::hub", "login get permit failed ({}) ({})", identity, e);
            e.context(op())
        })?;

        let expires = Utc::now().checked_add_signed(self.session_ttl).ok_or_else(|| {
            AuthError::unsupported(format!(
                "session ttl of {} seconds overflows the expiry time",
                self.session_ttl.num_seconds()
            ))
            .context(op())
        })?;

        let _guard = match self.session_limit {
            SessionLimit::Single => {
                let guard = self.login_lock(identity).lock();
                self.sessions.invalidate_for_identity(identity).map_err(|e| {
                    warn!(target: "authhub::hub", "invalidate sessions for ({}) failed while enforcing single session ({})", identity, e);
                    e.context(op())
                })?;
                Some(guard)
            }
            SessionLimit::Unlimited => None,
        };

        let session_key = generate_session_key().map_err(|e| e.context(op()))?;
        let token = Token::new(canonicalize(identity), expires, permit);
        self.sessions.write(&session_key, &token).map_err(|e| {
            warn!(target: "authhub::hub", "login session write failed ({}) ({})", identity, e);
            e.context(op())
        })?;
        self.stats.increment_good_login();
        info!(target: "authhub::hub", "login successful ({})", identity);
        Ok((session_key, token))
    }

    /// Erase a session. Unknown keys are not an error.
    pub fn logout(&self, session_key: &str) -> AuthResult<()> {
        self.ensure_open()?;
        self.stats.increment_logout();
        self.sessions.delete(session_key).map_err(|e| e.context("logout"))
    }

    pub fn invalidate_sessions_for_identity(&self, identity: &str) -> AuthResult<()> {
        self.ensure_open()?;
        self.sessions
            .invalidate_for_identity(identity)
            .map_err(|e| e.context(format!("invalidate sessions ({})", identity)))
    }

    pub fn get_permit(&self, identity: &str) -> AuthResult<Permit> {
        self.ensure_open()?;
        self.permits.get_permit(identity)
    }

    pub fn get_permits(&self) -> AuthResult<HashMap<String, Permit>> {
        self.ensure_open()?;
        self.permits.get_all_permits()
    }

    /// Store a new permit and push it into every live session of that identity.
    pub fn set_permit(&self, identity: &str, permit: &Permit) -> AuthResult<()> {
        self.ensure_open()?;
        if let Err(e) = self.permits.set_permit(identity, permit) {
            warn!(target: "authhub::hub", "set permit failed ({}) ({})", identity, e);
            return Err(e.context(format!("set permit ({})", identity)));
        }
        info!(target: "authhub::hub", "set permit successful ({})", identity);
        self.sessions
            .permit_changed(identity, permit)
            .map_err(|e| e.context(format!("set permit ({})", identity)))
    }

    /// Change a password. Every session of that identity is invalidated.
    pub fn set_password(&self, identity: &str, password: &str) -> AuthResult<()> {
        self.ensure_open()?;
        if let Err(e) = self.authenticator.set_password(identity, password) {
            warn!(target: "authhub::hub", "set password failed ({}) ({})", identity, e);
            return Err(e.context(format!("set password ({})", identity)));
        }
        info!(target: "authhub::hub", "set password successful ({})", identity);
        self.sessions
            .invalidate_for_identity(identity)
            .map_err(|e| e.context(format!("set password ({})", identity)))
    }

    /// Create an identity in the authenticator. Its permit is set separately with `set_permit`.
    pub fn create_authenticator_identity(&self, identity: &str, password: &str) -> AuthResult<()> {
        self.ensure_open()?;
        match self.authenticator.create_identity(identity, password) {
            Ok(()) => {
                info!(target: "authhub::hub", "create authenticator identity successful ({})", identity);
                Ok(())
            }
            Err(e) => {
                info!(target: "authhub::hub", "create authenticator identity failed ({}) ({})", identity, e);
                Err(e.context(format!("create identity ({})", identity)))
            }
        }
    }

    pub fn get_authenticator_identities(&self) -> AuthResult<Vec<String>> {
        self.ensure_open()?;
        self.authenticator.list_identities()
    }

    pub fn is_closed(&self) -> bool { self.closed.load(Ordering::SeqCst) }

    /// Ordered shutdown: authenticator, permit store, session cache, role group cache, then
    /// the log sink. A second call does nothing.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(target: "authhub::hub", "hub shutting down");
        self.authenticator.close();
        self.permits.close();
        self.sessions.close();
        if let Some(rg) = &self.role_groups {
            rg.close();
        }
        if let Some(sink) = &self.log_sink {
            sink.release();
        }
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod hub_tests;
