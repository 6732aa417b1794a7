use super::*;
use crate::error::ErrorKind;
use crate::session::MemorySessionStore;
use chrono::{Duration, Utc};
use std::sync::Barrier;
use std::sync::atomic::AtomicUsize;

/// Counts reads that reach the backing store; can fail permit changes on demand and
/// optionally park the next read on a barrier.
#[derive(Default)]
struct ProbeStore {
    inner: MemorySessionStore,
    reads: AtomicUsize,
    fail_permit_changes: AtomicBool,
    gate: Mutex<Option<Arc<Barrier>>>,
}

impl SessionStore for ProbeStore {
    fn read(&self, key: &str) -> AuthResult<Token> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let result = self.inner.read(key);
        let gate = self.gate.lock().take();
        if let Some(b) = gate {
            b.wait();
            b.wait();
        }
        result
    }
    fn write(&self, key: &str, token: &Token) -> AuthResult<()> { self.inner.write(key, token) }
    fn delete(&self, key: &str) -> AuthResult<()> { self.inner.delete(key) }
    fn invalidate_for_identity(&self, identity: &str) -> AuthResult<()> { self.inner.invalidate_for_identity(identity) }
    fn permit_changed(&self, identity: &str, permit: &Permit) -> AuthResult<()> {
        if self.fail_permit_changes.load(Ordering::SeqCst) {
            return Err(AuthError::connect("session db unreachable"));
        }
        self.inner.permit_changed(identity, permit)
    }
    fn close(&self) {}
}

fn token(identity: &str, permit: u8) -> Token {
    Token::new(identity.to_string(), Utc::now() + Duration::hours(1), Permit::new(vec![permit]))
}

#[test]
fn write_then_read_is_served_from_memory() {
    let store = Arc::new(ProbeStore::default());
    let cache = SessionCache::new(store.clone(), 0);
    let t = token("alice", 1);
    cache.write("k", &t).unwrap();
    assert_eq!(cache.read("k").unwrap(), t);
    assert_eq!(cache.read("k").unwrap(), t);
    assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    assert_eq!(store.inner.read("k").unwrap(), t, "write-through must persist");
    assert_eq!(cache.cache_stats().hits, 2);
}

#[test]
fn miss_reads_through_and_populates() {
    let store = Arc::new(ProbeStore::default());
    let t = token("alice", 1);
    store.inner.write("k", &t).unwrap();
    let cache = SessionCache::new(store.clone(), 0);
    assert_eq!(cache.read("k").unwrap(), t);
    assert_eq!(cache.read("k").unwrap(), t);
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn unknown_key_is_invalid_session() {
    let cache = SessionCache::new(Arc::new(MemorySessionStore::new()), 0);
    assert_eq!(cache.read("nope").unwrap_err().kind(), ErrorKind::InvalidSessionToken);
}

#[test]
fn delete_removes_both_layers_and_is_idempotent() {
    let store = Arc::new(ProbeStore::default());
    let cache = SessionCache::new(store.clone(), 0);
    cache.write("k", &token("alice", 1)).unwrap();
    cache.delete("k").unwrap();
    cache.delete("k").unwrap();
    cache.delete("never-existed").unwrap();
    assert!(cache.read("k").is_err());
    assert!(store.inner.read("k").is_err());
}

#[test]
fn invalidate_for_identity_is_case_insensitive_across_layers() {
    let store = Arc::new(ProbeStore::default());
    let cache = SessionCache::new(store.clone(), 0);
    cache.write("a1", &token("Alice", 1)).unwrap();
    cache.write("b1", &token("bob", 1)).unwrap();
    // persisted only, not cached
    store.inner.write("a2", &token("ALICE", 1)).unwrap();

    cache.invalidate_for_identity("alice").unwrap();
    assert!(cache.read("a1").is_err());
    assert!(cache.read("a2").is_err());
    assert!(cache.read("b1").is_ok());
}

#[test]
fn permit_change_reaches_cached_and_persisted_sessions() {
    let store = Arc::new(ProbeStore::default());
    let cache = SessionCache::new(store.clone(), 0);
    cache.write("cached", &token("alice", 1)).unwrap();
    store.inner.write("persisted", &token("Alice", 1)).unwrap();

    cache.permit_changed("ALICE", &Permit::new(vec![9])).unwrap();
    assert_eq!(cache.read("cached").unwrap().permit, Permit::new(vec![9]));
    assert_eq!(cache.read("persisted").unwrap().permit, Permit::new(vec![9]));
    assert_eq!(store.inner.read("cached").unwrap().permit, Permit::new(vec![9]));
}

#[test]
fn failed_permit_change_drops_cached_sessions() {
    let store = Arc::new(ProbeStore::default());
    let cache = SessionCache::new(store.clone(), 0);
    cache.write("k", &token("alice", 1)).unwrap();
    cache.write("other", &token("bob", 1)).unwrap();
    store.fail_permit_changes.store(true, Ordering::SeqCst);

    let err = cache.permit_changed("alice", &Permit::new(vec![9])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connect);
    assert_eq!(cache.len(), 1);
    // next read observes the store, which still holds the old permit
    assert_eq!(cache.read("k").unwrap().permit, Permit::new(vec![1]));
}

#[test]
fn lru_bound_evicts_least_recently_used() {
    let store = Arc::new(ProbeStore::default());
    let cache = SessionCache::new(store.clone(), 2);
    cache.set_store_enabled(false);
    cache.write("a", &token("a", 1)).unwrap();
    cache.write("b", &token("b", 1)).unwrap();
    cache.read("a").unwrap();
    cache.write("c", &token("c", 1)).unwrap();

    assert_eq!(cache.len(), 2);
    assert!(cache.read("a").is_ok());
    assert!(cache.read("c").is_ok());
    assert_eq!(cache.read("b").unwrap_err().kind(), ErrorKind::InvalidSessionToken);
    assert!(store.inner.is_empty(), "cache-only mode must not persist");
}

#[test]
fn evicted_session_is_recovered_from_store() {
    let store = Arc::new(ProbeStore::default());
    let cache = SessionCache::new(store.clone(), 1);
    cache.write("a", &token("a", 1)).unwrap();
    cache.write("b", &token("b", 1)).unwrap();
    assert_eq!(cache.read("a").unwrap().identity, "a");
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);
}

#[test]
fn shrinking_the_bound_evicts() {
    let cache = SessionCache::new(Arc::new(MemorySessionStore::new()), 0);
    for i in 0..10 {
        cache.write(&format!("k{}", i), &token("x", 1)).unwrap();
    }
    cache.set_max_sessions(3);
    assert_eq!(cache.len(), 3);
    cache.set_max_sessions(0);
    cache.write("k99", &token("x", 1)).unwrap();
    assert_eq!(cache.len(), 4);
}

#[test]
fn slow_read_through_does_not_resurrect_deleted_session() {
    let store = Arc::new(ProbeStore::default());
    store.inner.write("k", &token("alice", 1)).unwrap();
    let cache = Arc::new(SessionCache::new(store.clone(), 0));
    let barrier = Arc::new(Barrier::new(2));
    *store.gate.lock() = Some(barrier.clone());

    let reader = {
        let cache = cache.clone();
        std::thread::spawn(move || cache.read("k"))
    };
    barrier.wait(); // reader is inside the store read
    cache.delete("k").unwrap();
    barrier.wait(); // let it finish

    assert!(reader.join().unwrap().is_ok());
    assert_eq!(cache.len(), 0);
    assert!(cache.read("k").is_err());
}

#[test]
fn concurrent_writers_and_readers() {
    let cache = Arc::new(SessionCache::new(Arc::new(MemorySessionStore::new()), 64));
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    let key = format!("t{}-{}", t, i);
                    cache.write(&key, &token(&format!("user{}", t), 1)).unwrap();
                    assert_eq!(cache.read(&key).unwrap().identity, format!("user{}", t));
                    if i % 3 == 0 {
                        cache.delete(&key).unwrap();
                    }
                }
            })
        })
        .collect();
    for h in handles { h.join().unwrap(); }
    assert!(cache.len() <= 64);
}
