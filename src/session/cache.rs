//! Read-through / write-through cache in front of a persistent `SessionStore`.
//!
//! All in-memory state sits behind one mutex. Mutations reach the persistent store first
//! and the in-memory layer second. Every removal bumps a generation counter; a read-through
//! only populates the cache if no removal happened while it was talking to the store, so a
//! logout or invalidation can never be undone by a slow concurrent read.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use super::SessionStore;
use crate::error::{AuthError, AuthResult};
use crate::identity::{Permit, Token, canonicalize};

struct CacheState {
    entries: LruCache<String, Token>,
    generation: u64,
}

impl CacheState {
    fn keys_for(&self, canon: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, t)| canonicalize(&t.identity) == canon)
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

pub struct SessionCache {
    store: Arc<dyn SessionStore>,
    state: Mutex<CacheState>,
    store_enabled: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
}

fn lru_with_capacity(max_sessions: usize) -> LruCache<String, Token> {
    match NonZeroUsize::new(max_sessions) {
        Some(cap) => LruCache::new(cap),
        None => LruCache::unbounded(),
    }
}

impl SessionCache {
    /// `max_sessions == 0` leaves the in-memory layer unbounded.
    pub fn new(store: Arc<dyn SessionStore>, max_sessions: usize) -> Self {
        Self {
            store,
            state: Mutex::new(CacheState { entries: lru_with_capacity(max_sessions), generation: 0 }),
            store_enabled: AtomicBool::new(true),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Bound the in-memory layer, evicting least-recently-used sessions if it shrinks.
    /// Zero removes the bound.
    pub fn set_max_sessions(&self, max_sessions: usize) {
        let cap = NonZeroUsize::new(max_sessions).unwrap_or(NonZeroUsize::MAX);
        self.state.lock().entries.resize(cap);
    }

    /// Diagnostic only: with the store disabled nothing is persisted, so cache
    /// evictions lose sessions for good.
    pub fn set_store_enabled(&self, enabled: bool) {
        self.store_enabled.store(enabled, Ordering::SeqCst);
    }

    fn store_enabled(&self) -> bool {
        self.store_enabled.load(Ordering::SeqCst)
    }

    pub fn read(&self, key: &str) -> AuthResult<Token> {
        let generation = {
            let mut state = self.state.lock();
            if let Some(token) = state.entries.get(key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(token.clone());
            }
            state.generation
        };
        self.misses.fetch_add(1, Ordering::Relaxed);
        if !self.store_enabled() {
            return Err(AuthError::invalid_session());
        }
        let token = self.store.read(key)?;
        let mut state = self.state.lock();
        if state.generation == generation {
            state.entries.put(key.to_string(), token.clone());
        } else {
            debug!(target: "authhub::session", "read-through raced a removal; not caching");
        }
        Ok(token)
    }

    pub fn write(&self, key: &str, token: &Token) -> AuthResult<()> {
        if self.store_enabled() {
            self.store.write(key, token)?;
        }
        self.state.lock().entries.put(key.to_string(), token.clone());
        Ok(())
    }

    pub fn delete(&self, key: &str) -> AuthResult<()> {
        let result = if self.store_enabled() { self.store.delete(key) } else { Ok(()) };
        let mut state = self.state.lock();
        state.entries.pop(key);
        state.generation += 1;
        result
    }

    pub fn invalidate_for_identity(&self, identity: &str) -> AuthResult<()> {
        let result = if self.store_enabled() { self.store.invalidate_for_identity(identity) } else { Ok(()) };
        let canon = canonicalize(identity);
        let mut state = self.state.lock();
        let keys = state.keys_for(&canon);
        for k in &keys {
            state.entries.pop(k);
        }
        state.generation += 1;
        debug!(target: "authhub::session", "invalidated {} cached sessions for '{}'", keys.len(), identity);
        result
    }

    /// Swap the permit inside every live session of `identity`. The persistent store is
    /// authoritative: if it fails, cached sessions of that identity are dropped so the next
    /// read observes whatever the store holds.
    pub fn permit_changed(&self, identity: &str, permit: &Permit) -> AuthResult<()> {
        let result = if self.store_enabled() { self.store.permit_changed(identity, permit) } else { Ok(()) };
        let canon = canonicalize(identity);
        let mut state = self.state.lock();
        state.generation += 1;
        match &result {
            Ok(()) => {
                for (_, token) in state.entries.iter_mut() {
                    if canonicalize(&token.identity) == canon {
                        token.permit = permit.clone();
                    }
                }
            }
            Err(e) => {
                warn!(target: "authhub::session", "permit change for '{}' failed in store ({}); dropping cached sessions", identity, e);
                for k in state.keys_for(&canon) {
                    state.entries.pop(&k);
                }
            }
        }
        result
    }

    pub fn len(&self) -> usize { self.state.lock().entries.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    pub fn close(&self) {
        self.state.lock().entries.clear();
        self.store.close();
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
