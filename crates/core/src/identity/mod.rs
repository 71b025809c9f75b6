//! Rotating client-identity pool.
//!
//! Upstream sites block obviously scripted traffic, so every request is
//! sent with a plausible browser User-Agent drawn from a small pool. The
//! pool is an explicitly owned instance handed to the orchestrator - no
//! process-global state - which keeps tests free of cross-test
//! interference.

use std::sync::atomic::{AtomicUsize, Ordering};

/// The identity used when a custom pool turns out to be empty.
pub const DEFAULT_IDENTITY: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36";

/// Built-in pool of realistic browser identities.
const BUILTIN_IDENTITIES: &[&str] = &[
    DEFAULT_IDENTITY,
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) \
     Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Round-robin pool of client-identity strings.
///
/// Rotation state is a single atomic cursor, so `next_identity` is cheap
/// and safe to call from concurrent fetch tasks. It never returns an empty
/// string: an empty custom pool falls back to [`DEFAULT_IDENTITY`].
pub struct IdentityPool {
    identities: Vec<String>,
    cursor: AtomicUsize,
}

impl IdentityPool {
    /// Create a pool with the built-in browser identities.
    pub fn new() -> Self {
        Self::with_identities(BUILTIN_IDENTITIES.iter().map(|s| s.to_string()).collect())
    }

    /// Create a pool from caller-supplied identities.
    ///
    /// Empty strings are discarded; if nothing usable remains the pool
    /// holds just [`DEFAULT_IDENTITY`].
    pub fn with_identities(identities: Vec<String>) -> Self {
        let mut identities: Vec<String> =
            identities.into_iter().filter(|s| !s.is_empty()).collect();
        if identities.is_empty() {
            identities.push(DEFAULT_IDENTITY.to_string());
        }
        Self {
            identities,
            cursor: AtomicUsize::new(0),
        }
    }

    /// The next identity in rotation.
    pub fn next_identity(&self) -> &str {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.identities.len();
        &self.identities[index]
    }

    /// Number of identities in the pool.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Always false; construction guarantees at least one identity.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self::new()
    }
}
