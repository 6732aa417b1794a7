use super::*;
use chrono::{Duration, Utc};
use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};
use std::collections::HashSet;

#[test]
fn canonicalize_is_case_insensitive_and_idempotent() {
    assert_eq!(canonicalize("Bob@X.com"), canonicalize("bob@x.com"));
    for s in ["", "alice", "ALICE", "MiXeD@Example.COM", "Ünïcödé", "tab\tand space"] {
        let once = canonicalize(s);
        assert_eq!(canonicalize(&once), once, "not idempotent for {:?}", s);
    }
    assert!(same_identity("Alice", "aLiCe"));
    assert!(!same_identity("alice", "alicia"));
}

#[test]
fn permit_base64_roundtrip_for_random_payloads() {
    let mut rng = StdRng::seed_from_u64(0xA11CE);
    for _ in 0..200 {
        let len = rng.gen_range(0..512);
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        let p = Permit::new(bytes.clone());
        let back = Permit::deserialize(&p.serialize()).unwrap();
        assert_eq!(back, p);
        assert_eq!(back.roles(), &bytes[..]);
    }
}

#[test]
fn permit_serialized_form_is_standard_base64() {
    assert_eq!(Permit::new(vec![0xfb, 0xff]).serialize(), "+/8=");
    assert_eq!(Permit::default().serialize(), "");
}

#[test]
fn permit_deserialize_rejects_garbage() {
    assert!(Permit::deserialize("not base64 !!").is_err());
}

#[test]
fn permit_clone_is_independent() {
    let original = Permit::new(vec![1, 2, 3]);
    let clone = original.clone();
    assert_eq!(original, clone);
    let mut bytes = clone.into_roles();
    bytes[0] = 9;
    let changed = Permit::new(bytes);
    assert_ne!(original, changed);
    assert_eq!(original.roles(), &[1, 2, 3]);
}

#[test]
fn session_keys_are_fixed_length_alphanumeric_and_unique() {
    let mut seen = HashSet::new();
    for _ in 0..10_000 {
        let k = generate_session_key().unwrap();
        assert_eq!(k.len(), SESSION_KEY_LENGTH);
        assert!(k.bytes().all(|b| b.is_ascii_alphanumeric()), "bad key {}", k);
        assert!(!k.contains('='));
        assert!(seen.insert(k), "duplicate session key");
    }
}

#[test]
fn token_expiry_checks() {
    let now = Utc::now();
    let t = Token::new("alice".into(), now - Duration::seconds(1), Permit::default());
    assert!(t.is_expired_at(now));
    assert!(t.is_expired());
    let once = Token::new("alice".into(), far_future(), Permit::default());
    assert!(once.is_once_off());
    assert!(!once.is_expired());
}
