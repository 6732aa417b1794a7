//! Permit persistence capability. The hub calls straight through; any caching belongs to
//! the backend.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{AuthError, AuthResult};
use crate::identity::{Permit, canonicalize};

pub trait PermitStore: Send + Sync {
    fn get_permit(&self, identity: &str) -> AuthResult<Permit>;
    fn get_all_permits(&self) -> AuthResult<HashMap<String, Permit>>;
    fn set_permit(&self, identity: &str, permit: &Permit) -> AuthResult<()>;
    fn close(&self);
}

/// Permits held in process memory, keyed by canonical identity.
#[derive(Default)]
pub struct MemoryPermitStore {
    permits: RwLock<HashMap<String, Permit>>,
}

impl MemoryPermitStore {
    pub fn new() -> Self { Self::default() }
}

impl PermitStore for MemoryPermitStore {
    fn get_permit(&self, identity: &str) -> AuthResult<Permit> {
        self.permits
            .read()
            .get(&canonicalize(identity))
            .cloned()
            .ok_or_else(|| AuthError::permit_not_found(identity))
    }

    fn get_all_permits(&self) -> AuthResult<HashMap<String, Permit>> {
        Ok(self.permits.read().clone())
    }

    fn set_permit(&self, identity: &str, permit: &Permit) -> AuthResult<()> {
        self.permits.write().insert(canonicalize(identity), permit.clone());
        Ok(())
    }

    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn get_set_and_list() {
        let store = MemoryPermitStore::new();
        assert_eq!(store.get_permit("alice").unwrap_err().kind(), ErrorKind::IdentityPermitNotFound);
        store.set_permit("Alice", &Permit::new(vec![1, 2])).unwrap();
        assert_eq!(store.get_permit("alice").unwrap(), Permit::new(vec![1, 2]));
        store.set_permit("ALICE", &Permit::new(vec![3])).unwrap();
        let all = store.get_all_permits().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("alice"), Some(&Permit::new(vec![3])));
    }
}
