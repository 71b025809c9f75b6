//! TTL result cache with single-flight request coalescing.
//!
//! The cache stores whole per-key outcomes, successes and (optionally)
//! failures alike, each with its own time-to-live. Concurrent requests for
//! the same missing key are coalesced: exactly one caller becomes the
//! leader and runs the fetch, everyone else awaits the leader's result
//! over a watch channel. If the leader is cancelled mid-flight the channel
//! closes, the waiters wake, and one of them takes over.
//!
//! All bookkeeping sits behind one mutex that is never held across an
//! `.await`; the fetch itself runs with no lock held.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::debug;
use tokio::sync::watch;

use crate::errors::ConfigError;
use crate::models::RequestKey;

/// Cache tuning knobs.
#[derive(Clone, Debug)]
pub struct CacheOptions {
    /// Whether failed outcomes are stored at all.
    pub cache_failures: bool,
    /// Time-to-live for stored successes.
    pub success_ttl: Duration,
    /// Time-to-live for stored failures. Kept short so a transient
    /// upstream problem does not pin an error for the full success TTL.
    pub failure_ttl: Duration,
    /// Upper bound on stored entries; least-recently-used entries are
    /// evicted beyond it.
    pub max_entries: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            cache_failures: true,
            success_ttl: Duration::from_secs(600),
            failure_ttl: Duration::from_secs(30),
            max_entries: 1024,
        }
    }
}

impl CacheOptions {
    /// Validate the options, rejecting values that make the cache unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::new("max_entries must be at least 1"));
        }
        Ok(())
    }
}

/// One stored outcome with its expiry and recency bookkeeping.
struct CacheEntry<T, E> {
    result: Result<T, E>,
    expires_at: Instant,
    last_used: Instant,
}

type FlightReceiver<T, E> = watch::Receiver<Option<Result<T, E>>>;

struct Inner<T, E> {
    entries: HashMap<RequestKey, CacheEntry<T, E>>,
    // Registrations for fetches currently running. Held outside the entry
    // map so eviction can never drop an in-flight registration.
    in_flight: HashMap<RequestKey, FlightReceiver<T, E>>,
}

/// Shared result cache keyed by [`RequestKey`].
///
/// `T` and `E` must be cheap to clone: every waiter on a coalesced fetch
/// receives its own copy of the outcome.
pub struct ResultCache<T, E> {
    options: CacheOptions,
    inner: Mutex<Inner<T, E>>,
}

impl<T: Clone, E: Clone> ResultCache<T, E> {
    /// Create a cache with the given options. Call
    /// [`CacheOptions::validate`] first; an invalid `max_entries` would
    /// otherwise evict everything on insert.
    pub fn new(options: CacheOptions) -> Self {
        Self {
            options,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
            }),
        }
    }

    /// Return the cached outcome for `key`, or run `fetch` to produce it.
    ///
    /// A fresh stored outcome is returned without invoking `fetch`. On a
    /// miss, if another caller is already fetching this key the result is
    /// awaited from them; otherwise this caller runs `fetch` itself and
    /// publishes the outcome to any waiters.
    pub async fn get_or_fetch<F, Fut>(&self, key: &RequestKey, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut fetch = Some(fetch);

        loop {
            // Election: cached hit, join an existing flight, or lead one.
            let role = {
                let mut inner = self.lock_inner();
                let now = Instant::now();

                if let Some(entry) = inner.entries.get_mut(key) {
                    if entry.expires_at > now {
                        entry.last_used = now;
                        debug!("Cache hit for {}", key);
                        return entry.result.clone();
                    }
                    debug!("Cache entry expired for {}", key);
                    inner.entries.remove(key);
                }

                if let Some(receiver) = inner.in_flight.get(key) {
                    Role::Follower(receiver.clone())
                } else {
                    let (sender, receiver) = watch::channel(None);
                    inner.in_flight.insert(key.clone(), receiver);
                    Role::Leader(sender)
                }
            };

            match role {
                Role::Leader(sender) => {
                    if let Some(fetch) = fetch.take() {
                        return self.lead(key, sender, fetch()).await;
                    }
                    // A caller leads at most once; its closure is spent on
                    // that flight.
                    unreachable!("fetch closure consumed twice");
                }
                Role::Follower(mut receiver) => {
                    debug!("Awaiting in-flight fetch for {}", key);
                    loop {
                        match receiver.changed().await {
                            Ok(()) => {
                                let published = receiver.borrow_and_update().clone();
                                if let Some(result) = published {
                                    return result;
                                }
                            }
                            // Leader dropped without publishing; re-elect.
                            Err(_) => break,
                        }
                    }
                }
            }
        }
    }

    /// Run the fetch as the flight leader and publish the outcome.
    async fn lead<Fut>(
        &self,
        key: &RequestKey,
        sender: watch::Sender<Option<Result<T, E>>>,
        fut: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        // If this future is dropped before completion the guard removes the
        // registration; dropping `sender` with it closes the channel and
        // wakes the followers into re-election.
        let guard = FlightGuard {
            cache: self,
            key,
            armed: true,
        };

        let result = fut.await;
        self.store(key, &result);

        let mut guard = guard;
        guard.disarm();
        {
            let mut inner = self.lock_inner();
            inner.in_flight.remove(key);
        }
        // Waiters may all have gone; an unobserved send is fine.
        let _ = sender.send(Some(result.clone()));

        result
    }

    /// Store an outcome, honoring the failure policy and entry bound.
    fn store(&self, key: &RequestKey, result: &Result<T, E>) {
        let ttl = match result {
            Ok(_) => self.options.success_ttl,
            Err(_) => {
                if !self.options.cache_failures {
                    return;
                }
                self.options.failure_ttl
            }
        };

        let now = Instant::now();
        let mut inner = self.lock_inner();
        inner.entries.insert(
            key.clone(),
            CacheEntry {
                result: result.clone(),
                expires_at: now + ttl,
                last_used: now,
            },
        );

        while inner.entries.len() > self.options.max_entries {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    debug!("Evicting least-recently-used entry {}", key);
                    inner.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Drop the stored outcome for `key`, if any. In-flight fetches are
    /// unaffected.
    pub fn invalidate(&self, key: &RequestKey) {
        let mut inner = self.lock_inner();
        inner.entries.remove(key);
    }

    /// Drop every stored outcome.
    pub fn clear(&self) {
        let mut inner = self.lock_inner();
        inner.entries.clear();
    }

    /// Number of stored outcomes, including expired ones not yet reaped.
    pub fn len(&self) -> usize {
        self.lock_inner().entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock the bookkeeping state, recovering from a poisoned lock. No
    /// invariant spans the sections that could have been interrupted.
    fn lock_inner(&self) -> MutexGuard<'_, Inner<T, E>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

enum Role<T, E> {
    Leader(watch::Sender<Option<Result<T, E>>>),
    Follower(FlightReceiver<T, E>),
}

/// Removes a flight registration when the leader is dropped mid-fetch.
struct FlightGuard<'a, T, E> {
    cache: &'a ResultCache<T, E>,
    key: &'a RequestKey,
    armed: bool,
}

impl<T, E> FlightGuard<'_, T, E> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T, E> Drop for FlightGuard<'_, T, E> {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self
                .cache
                .inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            inner.in_flight.remove(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type TestCache = ResultCache<String, String>;

    fn options(ttl: Duration) -> CacheOptions {
        CacheOptions {
            cache_failures: true,
            success_ttl: ttl,
            failure_ttl: ttl,
            max_entries: 16,
        }
    }

    #[tokio::test]
    async fn test_fresh_hit_skips_fetch() {
        let cache = TestCache::new(options(Duration::from_secs(60)));
        let key = RequestKey::new("https://example.com/a");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let result = cache
                .get_or_fetch(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("payload".to_string())
                })
                .await;
            assert_eq!(result, Ok("payload".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let cache = TestCache::new(options(Duration::ZERO));
        let key = RequestKey::new("https://example.com/a");
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let _ = cache
                .get_or_fetch(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("payload".to_string())
                })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_cached_only_when_enabled() {
        let mut opts = options(Duration::from_secs(60));
        opts.cache_failures = false;
        let cache = TestCache::new(opts);
        let key = RequestKey::new("https://example.com/a");
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = cache
                .get_or_fetch(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("boom".to_string())
                })
                .await;
            assert_eq!(result, Err("boom".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cached_failure_is_served() {
        let cache = TestCache::new(options(Duration::from_secs(60)));
        let key = RequestKey::new("https://example.com/a");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let result = cache
                .get_or_fetch(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("boom".to_string())
                })
                .await;
            assert_eq!(result, Err("boom".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_coalesce_to_one_fetch() {
        let cache = Arc::new(TestCache::new(options(Duration::from_secs(60))));
        let key = RequestKey::new("https://example.com/a");
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(&key, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok("payload".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok("payload".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_leader_hands_off_to_follower() {
        let cache = Arc::new(TestCache::new(options(Duration::from_secs(60))));
        let key = RequestKey::new("https://example.com/a");

        let leader = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch(&key, || async {
                        // Never completes; the task gets aborted instead.
                        std::future::pending::<Result<String, String>>().await
                    })
                    .await
            })
        };
        // Let the leader register its flight before the follower arrives.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let follower = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            tokio::spawn(
                async move { cache.get_or_fetch(&key, || async { Ok("rescued".to_string()) }).await },
            )
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        leader.abort();
        let result = tokio::time::timeout(Duration::from_secs(1), follower)
            .await
            .expect("follower should not hang")
            .unwrap();
        assert_eq!(result, Ok("rescued".to_string()));
    }

    #[tokio::test]
    async fn test_lru_eviction_keeps_recently_used() {
        let mut opts = options(Duration::from_secs(60));
        opts.max_entries = 2;
        let cache = TestCache::new(opts);

        let key_a = RequestKey::new("https://example.com/a");
        let key_b = RequestKey::new("https://example.com/b");
        let key_c = RequestKey::new("https://example.com/c");

        let _ = cache.get_or_fetch(&key_a, || async { Ok("a".to_string()) }).await;
        let _ = cache.get_or_fetch(&key_b, || async { Ok("b".to_string()) }).await;
        // Touch A so B is the least recently used.
        let _ = cache.get_or_fetch(&key_a, || async { Ok("a2".to_string()) }).await;
        let _ = cache.get_or_fetch(&key_c, || async { Ok("c".to_string()) }).await;

        assert_eq!(cache.len(), 2);
        let calls = AtomicUsize::new(0);
        let result = cache
            .get_or_fetch(&key_b, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("b2".to_string())
            })
            .await;
        assert_eq!(result, Ok("b2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_eviction_pressure_spares_in_flight_fetch() {
        let mut opts = options(Duration::from_secs(60));
        opts.max_entries = 2;
        let cache = Arc::new(TestCache::new(opts));
        let slow_key = RequestKey::new("https://example.com/slow");
        let calls = Arc::new(AtomicUsize::new(0));

        let leader = {
            let cache = Arc::clone(&cache);
            let key = slow_key.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_fetch(&key, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok("slow".to_string())
                    })
                    .await
            })
        };
        // Let the leader register its flight before applying pressure.
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Churn enough other keys to evict everything stored.
        for i in 0..4 {
            let key = RequestKey::new(format!("https://example.com/filler/{}", i));
            let result = cache
                .get_or_fetch(&key, || async { Ok("filler".to_string()) })
                .await;
            assert_eq!(result, Ok("filler".to_string()));
        }
        assert_eq!(cache.len(), 2);

        // The flight survived the churn: a late caller still coalesces
        // onto it instead of fetching again.
        let follower = {
            let cache = Arc::clone(&cache);
            let key = slow_key.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_fetch(&key, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok("second".to_string())
                    })
                    .await
            })
        };

        assert_eq!(leader.await.unwrap(), Ok("slow".to_string()));
        assert_eq!(follower.await.unwrap(), Ok("slow".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = TestCache::new(options(Duration::from_secs(60)));
        let key = RequestKey::new("https://example.com/a");
        let calls = AtomicUsize::new(0);

        let fetch = || {
            calls.fetch_add(1, Ordering::SeqCst);
        };
        let _ = cache
            .get_or_fetch(&key, || async {
                fetch();
                Ok("v1".to_string())
            })
            .await;
        cache.invalidate(&key);
        let result = cache
            .get_or_fetch(&key, || async {
                fetch();
                Ok("v2".to_string())
            })
            .await;
        assert_eq!(result, Ok("v2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_options_validation() {
        let mut opts = CacheOptions::default();
        assert!(opts.validate().is_ok());
        opts.max_entries = 0;
        assert!(opts.validate().is_err());
    }
}
