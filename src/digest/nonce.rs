//! Server nonce issuance and validation.
//!
//! Nonces are 128 random bits from the system CSPRNG, hex encoded, and are
//! tracked in a [`DashMap`] shared by all request handlers. Each nonce carries
//! an opaque companion value, an expiry and the highest nonce count accepted so
//! far, which is what makes a `(nonce, nc)` pair single use.
//!
//! The store is bounded without a background task: every
//! [`SWEEP_INTERVAL`] issues run a [`sweep`](NonceManager::sweep), and once
//! `max_entries` is reached the nonces closest to expiry are evicted.

use crate::config::NonceConfig;
use crate::errors::{AuthError, Result};
use crate::security::timing_protection::constant_time_string_compare;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, warn};

const NONCE_BYTES: usize = 16;

/// Issues between opportunistic sweeps.
pub const SWEEP_INTERVAL: usize = 1024;

/// A freshly issued nonce.
#[derive(Debug, Clone)]
pub struct Nonce {
    /// Value sent to the client in the challenge
    pub value: String,

    /// Opaque value sent alongside the nonce
    pub opaque: String,

    /// When the nonce was issued
    pub issued_at: DateTime<Utc>,

    /// When the nonce stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Outcome of checking a nonce against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceStatus {
    /// The nonce was issued by this server and is still fresh
    Valid,

    /// The nonce was never issued, or has been swept or invalidated
    Unknown,

    /// The nonce was issued but its lifetime has passed
    Expired,

    /// The nonce count was not greater than one already accepted
    Replayed,

    /// The client echoed an opaque value that does not belong to the nonce
    OpaqueMismatch,
}

#[derive(Debug, Clone)]
struct NonceEntry {
    opaque: String,
    expires_at: DateTime<Utc>,
    highest_nc: Option<u32>,
}

impl NonceEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Issues and validates server nonces.
#[derive(Debug)]
pub struct NonceManager {
    entries: DashMap<String, NonceEntry>,
    config: NonceConfig,
    rng: SystemRandom,
    issued: AtomicUsize,
}

impl NonceManager {
    /// Create a nonce manager with the given lifecycle settings.
    pub fn new(config: NonceConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            rng: SystemRandom::new(),
            issued: AtomicUsize::new(0),
        }
    }

    /// Issue and remember a new nonce.
    pub fn issue(&self) -> Result<Nonce> {
        let value = self.random_hex()?;
        let opaque = self.random_hex()?;
        let issued_at = Utc::now();
        let expires_at = add_duration(issued_at, self.config.ttl());

        let issued = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        if issued % SWEEP_INTERVAL == 0 {
            self.sweep();
        }
        if self.entries.len() >= self.config.max_entries {
            self.enforce_capacity();
        }

        self.entries.insert(
            value.clone(),
            NonceEntry {
                opaque: opaque.clone(),
                expires_at,
                highest_nc: None,
            },
        );

        debug!("Issued nonce expiring at {}", expires_at);

        Ok(Nonce {
            value,
            opaque,
            issued_at,
            expires_at,
        })
    }

    /// Check a nonce without recording a nonce count.
    pub fn lookup(&self, nonce: &str, opaque: Option<&str>) -> NonceStatus {
        let Some(entry) = self.entries.get(nonce) else {
            return NonceStatus::Unknown;
        };

        if let Some(opaque) = opaque {
            if !constant_time_string_compare(opaque, &entry.opaque) {
                return NonceStatus::OpaqueMismatch;
            }
        }

        if entry.is_expired(Utc::now()) {
            NonceStatus::Expired
        } else {
            NonceStatus::Valid
        }
    }

    /// Check a nonce and, when it is fresh, record `nonce_count` as used.
    ///
    /// With nonce count enforcement enabled a count is accepted only if it is
    /// strictly greater than every count previously accepted for the nonce.
    pub fn validate(&self, nonce: &str, nonce_count: u32, opaque: Option<&str>) -> NonceStatus {
        let Some(mut entry) = self.entries.get_mut(nonce) else {
            return NonceStatus::Unknown;
        };

        if let Some(opaque) = opaque {
            if !constant_time_string_compare(opaque, &entry.opaque) {
                return NonceStatus::OpaqueMismatch;
            }
        }

        if entry.is_expired(Utc::now()) {
            return NonceStatus::Expired;
        }

        if self.config.enforce_nonce_count {
            if entry.highest_nc.is_some_and(|seen| nonce_count <= seen) {
                return NonceStatus::Replayed;
            }
            entry.highest_nc = Some(nonce_count);
        }

        NonceStatus::Valid
    }

    /// Forget a nonce.
    pub fn invalidate(&self, nonce: &str) -> bool {
        self.entries.remove(nonce).is_some()
    }

    /// Remove nonces that expired longer ago than the stale retention window.
    ///
    /// Returns the number of nonces removed.
    pub fn sweep(&self) -> usize {
        let cutoff = chrono::Duration::from_std(self.config.stale_retention())
            .ok()
            .and_then(|retention| Utc::now().checked_sub_signed(retention))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = entry.expires_at > cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            debug!("Swept {} expired nonces", removed);
        }
        removed
    }

    /// Make room for a new nonce once the store is full.
    ///
    /// Sweeps first. If the store is still full, evicts the nonces closest to
    /// expiry until it is at nine tenths of capacity.
    fn enforce_capacity(&self) {
        let max = self.config.max_entries;
        self.sweep();
        if self.entries.len() < max {
            return;
        }

        let target = max.saturating_sub(max / 10 + 1);
        let mut by_expiry: Vec<(DateTime<Utc>, String)> = self
            .entries
            .iter()
            .map(|entry| (entry.expires_at, entry.key().clone()))
            .collect();
        by_expiry.sort_unstable();

        let excess = by_expiry.len().saturating_sub(target);
        for (_, nonce) in by_expiry.into_iter().take(excess) {
            self.entries.remove(&nonce);
        }

        warn!(
            "Nonce store reached {} entries; evicted {} oldest nonces",
            max, excess
        );
    }

    /// Number of nonces currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no nonces are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lifecycle settings.
    pub fn config(&self) -> &NonceConfig {
        &self.config
    }

    /// Run [`sweep`](Self::sweep) every `interval` until the manager is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let manager: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match manager.upgrade() {
                    Some(manager) => {
                        manager.sweep();
                    }
                    None => break,
                }
            }
        })
    }

    fn random_hex(&self) -> Result<String> {
        let mut bytes = [0u8; NONCE_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AuthError::crypto("Failed to generate nonce"))?;
        Ok(hex::encode(bytes))
    }
}

impl Default for NonceManager {
    fn default() -> Self {
        Self::new(NonceConfig::default())
    }
}

fn add_duration(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expired_config() -> NonceConfig {
        NonceConfig {
            ttl_seconds: 0,
            stale_retention_seconds: 300,
            enforce_nonce_count: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_issue_generates_unique_hex_values() {
        let manager = NonceManager::default();
        let a = manager.issue().unwrap();
        let b = manager.issue().unwrap();

        assert_eq!(a.value.len(), NONCE_BYTES * 2);
        assert!(a.value.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.value, b.value);
        assert_ne!(a.value, a.opaque);
        assert!(a.expires_at > a.issued_at);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_unknown_nonce() {
        let manager = NonceManager::default();
        assert_eq!(manager.lookup("deadbeef", None), NonceStatus::Unknown);
        assert_eq!(manager.validate("deadbeef", 1, None), NonceStatus::Unknown);
    }

    #[test]
    fn test_nonce_count_is_single_use() {
        let manager = NonceManager::default();
        let nonce = manager.issue().unwrap();

        assert_eq!(manager.validate(&nonce.value, 1, None), NonceStatus::Valid);
        assert_eq!(manager.validate(&nonce.value, 1, None), NonceStatus::Replayed);
        assert_eq!(manager.validate(&nonce.value, 2, None), NonceStatus::Valid);
        assert_eq!(manager.validate(&nonce.value, 1, None), NonceStatus::Replayed);
    }

    #[test]
    fn test_nonce_count_not_enforced_when_disabled() {
        let manager =
            NonceManager::new(NonceConfig::default().with_nonce_count_enforcement(false));
        let nonce = manager.issue().unwrap();

        assert_eq!(manager.validate(&nonce.value, 1, None), NonceStatus::Valid);
        assert_eq!(manager.validate(&nonce.value, 1, None), NonceStatus::Valid);
    }

    #[test]
    fn test_opaque_must_match_when_echoed() {
        let manager = NonceManager::default();
        let nonce = manager.issue().unwrap();

        assert_eq!(
            manager.lookup(&nonce.value, Some(&nonce.opaque)),
            NonceStatus::Valid
        );
        assert_eq!(
            manager.lookup(&nonce.value, Some("not-the-opaque")),
            NonceStatus::OpaqueMismatch
        );
        assert_eq!(manager.lookup(&nonce.value, None), NonceStatus::Valid);
    }

    #[test]
    fn test_expired_nonce_is_reported_until_swept() {
        let manager = NonceManager::new(expired_config());
        let nonce = manager.issue().unwrap();

        assert_eq!(manager.lookup(&nonce.value, None), NonceStatus::Expired);
        assert_eq!(manager.validate(&nonce.value, 1, None), NonceStatus::Expired);

        // Still inside the stale retention window.
        assert_eq!(manager.sweep(), 0);
        assert_eq!(manager.lookup(&nonce.value, None), NonceStatus::Expired);
    }

    #[test]
    fn test_sweep_removes_nonces_past_retention() {
        let manager = NonceManager::new(NonceConfig {
            ttl_seconds: 0,
            stale_retention_seconds: 0,
            enforce_nonce_count: true,
            ..Default::default()
        });
        let nonce = manager.issue().unwrap();

        assert_eq!(manager.sweep(), 1);
        assert!(manager.is_empty());
        assert_eq!(manager.lookup(&nonce.value, None), NonceStatus::Unknown);
    }

    #[test]
    fn test_store_stays_bounded_without_sweeper() {
        let manager = NonceManager::new(NonceConfig::default().with_max_entries(100));
        let first = manager.issue().unwrap();

        for _ in 0..5_000 {
            manager.issue().unwrap();
            assert!(manager.len() <= 100, "tracked {} nonces", manager.len());
        }

        assert_eq!(manager.lookup(&first.value, None), NonceStatus::Unknown);
        let latest = manager.issue().unwrap();
        assert_eq!(manager.lookup(&latest.value, None), NonceStatus::Valid);
    }

    #[test]
    fn test_full_store_sweeps_before_evicting() {
        let manager = NonceManager::new(NonceConfig {
            ttl_seconds: 0,
            stale_retention_seconds: 0,
            max_entries: 3,
            ..Default::default()
        });
        for _ in 0..3 {
            manager.issue().unwrap();
        }

        // Everything tracked is already past retention, so a sweep empties it.
        let fresh = manager.issue().unwrap();
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.lookup(&fresh.value, None), NonceStatus::Expired);
    }

    #[test]
    fn test_invalidate() {
        let manager = NonceManager::default();
        let nonce = manager.issue().unwrap();

        assert!(manager.invalidate(&nonce.value));
        assert!(!manager.invalidate(&nonce.value));
        assert_eq!(manager.lookup(&nonce.value, None), NonceStatus::Unknown);
    }

    #[test]
    fn test_concurrent_validation_accepts_each_count_once() {
        let manager = Arc::new(NonceManager::default());
        let nonce = manager.issue().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let value = nonce.value.clone();
                std::thread::spawn(move || manager.validate(&value, 1, None))
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|status| *status == NonceStatus::Valid)
            .count();
        assert_eq!(accepted, 1);
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_manager_dropped() {
        let manager = Arc::new(NonceManager::new(NonceConfig {
            ttl_seconds: 0,
            stale_retention_seconds: 0,
            enforce_nonce_count: true,
            ..Default::default()
        }));
        manager.issue().unwrap();

        let handle = manager.spawn_sweeper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(manager.is_empty());

        drop(manager);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should exit")
            .expect("sweeper should not panic");
    }
}
