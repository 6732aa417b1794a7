//! Name-keyed backend constructors. Each capability has its own table; the hub never
//! learns which concrete backend it was given. Only the in-memory backends are built in,
//! directory and SQL backends are registered by the embedding application.

use std::collections::HashMap;
use std::sync::Arc;

use crate::authenticator::{Authenticator, MemoryAuthenticator};
use crate::config::{AuthenticatorConfig, DbConnection, LdapMode};
use crate::error::{AuthError, AuthResult};
use crate::permit_store::{MemoryPermitStore, PermitStore};
use crate::role_group::{MemoryRoleGroupStore, RoleGroupStore};
use crate::session::{MemorySessionStore, SessionStore};

pub type AuthenticatorCtor = Box<dyn Fn(&AuthenticatorConfig) -> AuthResult<Arc<dyn Authenticator>> + Send + Sync>;
pub type PermitStoreCtor = Box<dyn Fn(&DbConnection) -> AuthResult<Arc<dyn PermitStore>> + Send + Sync>;
pub type SessionStoreCtor = Box<dyn Fn(&DbConnection) -> AuthResult<Arc<dyn SessionStore>> + Send + Sync>;
pub type RoleGroupStoreCtor = Box<dyn Fn(&DbConnection) -> AuthResult<Arc<dyn RoleGroupStore>> + Send + Sync>;

pub const MEMORY_DRIVER: &str = "memory";

pub struct BackendRegistry {
    authenticators: HashMap<String, AuthenticatorCtor>,
    permit_stores: HashMap<String, PermitStoreCtor>,
    session_stores: HashMap<String, SessionStoreCtor>,
    role_group_stores: HashMap<String, RoleGroupStoreCtor>,
}

impl Default for BackendRegistry {
    fn default() -> Self { Self::with_builtins() }
}

fn dummy_authenticator(cfg: &AuthenticatorConfig) -> AuthResult<Arc<dyn Authenticator>> {
    let auth = MemoryAuthenticator::with_identities(cfg.identities.iter().map(|(i, p)| (i.as_str(), p.as_str())))?;
    Ok(Arc::new(auth))
}

fn driver_name(db: &DbConnection) -> String {
    if db.driver.is_empty() { MEMORY_DRIVER.to_string() } else { db.driver.to_ascii_lowercase() }
}

impl BackendRegistry {
    /// A registry with no constructors at all.
    pub fn empty() -> Self {
        Self {
            authenticators: HashMap::new(),
            permit_stores: HashMap::new(),
            session_stores: HashMap::new(),
            role_group_stores: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut r = Self::empty();
        r.register_authenticator("dummy", dummy_authenticator);
        r.register_permit_store(MEMORY_DRIVER, |_| Ok(Arc::new(MemoryPermitStore::new()) as Arc<dyn PermitStore>));
        r.register_session_store(MEMORY_DRIVER, |_| Ok(Arc::new(MemorySessionStore::new()) as Arc<dyn SessionStore>));
        r.register_role_group_store(MEMORY_DRIVER, |_| Ok(Arc::new(MemoryRoleGroupStore::new()) as Arc<dyn RoleGroupStore>));
        r
    }

    pub fn register_authenticator<F>(&mut self, kind: &str, ctor: F)
    where
        F: Fn(&AuthenticatorConfig) -> AuthResult<Arc<dyn Authenticator>> + Send + Sync + 'static,
    {
        self.authenticators.insert(kind.to_ascii_lowercase(), Box::new(ctor));
    }

    pub fn register_permit_store<F>(&mut self, driver: &str, ctor: F)
    where
        F: Fn(&DbConnection) -> AuthResult<Arc<dyn PermitStore>> + Send + Sync + 'static,
    {
        self.permit_stores.insert(driver.to_ascii_lowercase(), Box::new(ctor));
    }

    pub fn register_session_store<F>(&mut self, driver: &str, ctor: F)
    where
        F: Fn(&DbConnection) -> AuthResult<Arc<dyn SessionStore>> + Send + Sync + 'static,
    {
        self.session_stores.insert(driver.to_ascii_lowercase(), Box::new(ctor));
    }

    pub fn register_role_group_store<F>(&mut self, driver: &str, ctor: F)
    where
        F: Fn(&DbConnection) -> AuthResult<Arc<dyn RoleGroupStore>> + Send + Sync + 'static,
    {
        self.role_group_stores.insert(driver.to_ascii_lowercase(), Box::new(ctor));
    }

    pub fn create_authenticator(&self, cfg: &AuthenticatorConfig) -> AuthResult<Arc<dyn Authenticator>> {
        let kind = cfg.kind.to_ascii_lowercase();
        if kind == "ldap" && LdapMode::parse(&cfg.encryption).is_none() {
            return Err(AuthError::unsupported(format!("unknown ldap mode '{}'", cfg.encryption)));
        }
        match self.authenticators.get(&kind) {
            Some(ctor) => ctor(cfg),
            None => Err(AuthError::unsupported(format!("no '{}' authenticator registered", cfg.kind))),
        }
    }

    pub fn create_permit_store(&self, db: &DbConnection) -> AuthResult<Arc<dyn PermitStore>> {
        let driver = driver_name(db);
        match self.permit_stores.get(&driver) {
            Some(ctor) => ctor(db),
            None => Err(AuthError::unsupported(format!("no '{}' permit store registered", driver))),
        }
    }

    pub fn create_session_store(&self, db: &DbConnection) -> AuthResult<Arc<dyn SessionStore>> {
        let driver = driver_name(db);
        match self.session_stores.get(&driver) {
            Some(ctor) => ctor(db),
            None => Err(AuthError::unsupported(format!("no '{}' session store registered", driver))),
        }
    }

    /// `Ok(None)` when no role group driver is configured.
    pub fn create_role_group_store(&self, db: &DbConnection) -> AuthResult<Option<Arc<dyn RoleGroupStore>>> {
        if db.driver.is_empty() {
            return Ok(None);
        }
        let driver = driver_name(db);
        match self.role_group_stores.get(&driver) {
            Some(ctor) => ctor(db).map(Some),
            None => Err(AuthError::unsupported(format!("no '{}' role group store registered", driver))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn builtins_cover_dummy_and_memory() {
        let r = BackendRegistry::default();
        let mut cfg = AuthenticatorConfig::default();
        cfg.identities.insert("alice".into(), "pw".into());
        let auth = r.create_authenticator(&cfg).unwrap();
        assert!(auth.authenticate("alice", "pw").is_ok());
        assert!(r.create_permit_store(&DbConnection::memory()).is_ok());
        assert!(r.create_session_store(&DbConnection::default()).is_ok());
        assert!(r.create_role_group_store(&DbConnection::default()).unwrap().is_none());
        assert!(r.create_role_group_store(&DbConnection::memory()).unwrap().is_some());
    }

    #[test]
    fn unregistered_backends_are_unsupported() {
        let r = BackendRegistry::default();
        let cfg = AuthenticatorConfig { kind: "ldap".into(), ..Default::default() };
        assert_eq!(r.create_authenticator(&cfg).err().unwrap().kind(), ErrorKind::Unsupported);
        let pg = DbConnection { driver: "postgres".into(), ..Default::default() };
        let err = r.create_session_store(&pg).err().unwrap();
        assert_eq!(err.to_string(), "Unsupported operation: no 'postgres' session store registered");
    }

    #[test]
    fn registered_constructor_is_used() {
        let mut r = BackendRegistry::empty();
        r.register_authenticator("LDAP", |cfg| {
            Err(AuthError::connect(format!("{}:{}", cfg.ldap_host, cfg.ldap_port)))
        });
        let cfg = AuthenticatorConfig { kind: "ldap".into(), ldap_host: "dir".into(), ..Default::default() };
        assert_eq!(r.create_authenticator(&cfg).err().unwrap().to_string(), "Connect failed: dir:389");
    }
}
