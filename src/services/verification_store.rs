use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// How long an issued code stays valid.
pub const CODE_TTL_SECS: i64 = 300;

/// Time source for expiry checks. Injected so tests can drive the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct VerificationEntry {
    code: String,
    expires_at: DateTime<Utc>,
}

/// In-memory store of pending login verification codes, keyed by email.
///
/// Holds at most one live entry per email; issuing a new code silently
/// replaces any prior one. Consumption is single-use and time-boxed.
/// Expired entries are not swept in the background: they stay until
/// overwritten by a later issue or until the process restarts.
#[derive(Clone)]
pub struct VerificationStore {
    entries: Arc<RwLock<HashMap<String, VerificationEntry>>>,
    clock: Arc<dyn Clock>,
}

impl VerificationStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Record a code for this email, replacing any existing entry.
    /// The entry expires `CODE_TTL_SECS` after the call.
    pub async fn issue(&self, email: &str, code: &str) {
        let expires_at = self.clock.now() + Duration::seconds(CODE_TTL_SECS);
        let mut entries = self.entries.write().await;
        entries.insert(
            email.to_string(),
            VerificationEntry {
                code: code.to_string(),
                expires_at,
            },
        );
    }

    /// Check a candidate code and delete the entry on success.
    ///
    /// Returns true iff an entry exists, the stored code equals the
    /// candidate exactly, and the current time is strictly before the
    /// entry's expiry. Check-and-delete happens under one write lock, so
    /// racing consumers of the same code see at most one success. On a
    /// false result the entry is left untouched, so a mistyped but still
    /// valid code can be retried.
    pub async fn consume(&self, email: &str, candidate: &str) -> bool {
        let mut entries = self.entries.write().await;

        let is_valid = match entries.get(email) {
            Some(entry) => entry.code == candidate && self.clock.now() < entry.expires_at,
            None => false,
        };

        if is_valid {
            entries.remove(email);
        }

        is_valid
    }

    /// Whether any entry (live or expired) is recorded for this email.
    pub async fn has_pending(&self, email: &str) -> bool {
        self.entries.read().await.contains_key(email)
    }
}

impl Default for VerificationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Clock that only moves when a test tells it to.
    pub(crate) struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub(crate) fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        pub(crate) fn advance(&self, duration: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += duration;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let store = VerificationStore::new();
        store.issue("a@x.com", "123456").await;

        assert!(store.consume("a@x.com", "123456").await);
        assert!(!store.consume("a@x.com", "123456").await);
    }

    #[tokio::test]
    async fn test_mismatch_does_not_consume() {
        let store = VerificationStore::new();
        store.issue("a@x.com", "123456").await;

        assert!(!store.consume("a@x.com", "654321").await);
        // entry survives a wrong guess
        assert!(store.consume("a@x.com", "123456").await);
    }

    #[tokio::test]
    async fn test_expired_code_is_rejected() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = VerificationStore::with_clock(clock.clone());

        store.issue("a@x.com", "123456").await;
        clock.advance(Duration::seconds(CODE_TTL_SECS + 1));

        assert!(!store.consume("a@x.com", "123456").await);
        // the stale entry lingers but does not block a fresh issue
        assert!(store.has_pending("a@x.com").await);
        store.issue("a@x.com", "777777").await;
        assert!(store.consume("a@x.com", "777777").await);
    }

    #[tokio::test]
    async fn test_expiry_boundary_is_strict() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = VerificationStore::with_clock(clock.clone());

        store.issue("a@x.com", "123456").await;
        clock.advance(Duration::seconds(CODE_TTL_SECS));

        // now == expires_at is already too late
        assert!(!store.consume("a@x.com", "123456").await);
    }

    #[tokio::test]
    async fn test_issue_overwrites_previous_code() {
        let store = VerificationStore::new();
        store.issue("a@x.com", "111111").await;
        store.issue("a@x.com", "222222").await;

        assert!(!store.consume("a@x.com", "111111").await);
        assert!(store.consume("a@x.com", "222222").await);
    }

    #[tokio::test]
    async fn test_identifiers_are_isolated() {
        let store = VerificationStore::new();
        store.issue("a@x.com", "123456").await;

        assert!(!store.consume("b@x.com", "123456").await);
        assert!(store.consume("a@x.com", "123456").await);
    }

    #[tokio::test]
    async fn test_identifiers_are_case_sensitive() {
        let store = VerificationStore::new();
        store.issue("a@x.com", "123456").await;

        assert!(!store.consume("A@X.COM", "123456").await);
        assert!(store.consume("a@x.com", "123456").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consume_succeeds_exactly_once() {
        let store = VerificationStore::new();
        store.issue("a@x.com", "123456").await;

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.consume("a@x.com", "123456").await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
    }
}
