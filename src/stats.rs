//! Process-lifetime counters with sampled logging.
//! A counter logs when its new value is a power of two or a multiple of 256, which gives
//! dense visibility early on and sparse visibility at high volume.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Whether a counter that just reached `n` should emit a log line.
pub fn should_log(n: u64) -> bool {
    n.is_power_of_two() || n % 256 == 0
}

#[derive(Debug, Default)]
pub struct Stats {
    pub invalid_session_keys: Counter,
    pub expired_session_keys: Counter,
    pub invalid_passwords: Counter,
    pub empty_identities: Counter,
    pub good_once_off_auth: Counter,
    pub good_login: Counter,
    pub logout: Counter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub invalid_session_keys: u64,
    pub expired_session_keys: u64,
    pub invalid_passwords: u64,
    pub empty_identities: u64,
    pub good_once_off_auth: u64,
    pub good_login: u64,
    pub logout: u64,
}

fn increment_and_log(name: &str, counter: &Counter) -> u64 {
    let n = counter.increment();
    if should_log(n) {
        info!(target: "authhub::stats", count = n, "{} {}", n, name);
    }
    n
}

impl Stats {
    pub fn new() -> Self { Self::default() }

    pub fn increment_invalid_session_key(&self) -> u64 { increment_and_log("invalid session keys", &self.invalid_session_keys) }
    pub fn increment_expired_session_key(&self) -> u64 { increment_and_log("expired session keys", &self.expired_session_keys) }
    pub fn increment_invalid_passwords(&self) -> u64 { increment_and_log("invalid passwords", &self.invalid_passwords) }
    pub fn increment_empty_identities(&self) -> u64 { increment_and_log("empty identities", &self.empty_identities) }
    pub fn increment_good_once_off_auth(&self) -> u64 { increment_and_log("good once-off auth", &self.good_once_off_auth) }
    pub fn increment_good_login(&self) -> u64 { increment_and_log("good login", &self.good_login) }
    pub fn increment_logout(&self) -> u64 { increment_and_log("logout", &self.logout) }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            invalid_session_keys: self.invalid_session_keys.get(),
            expired_session_keys: self.expired_session_keys.get(),
            invalid_passwords: self.invalid_passwords.get(),
            empty_identities: self.empty_identities.get(),
            good_once_off_auth: self.good_once_off_auth.get(),
            good_login: self.good_login.get(),
            logout: self.logout.get(),
        }
    }
}
