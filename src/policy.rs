//! Subscription tiers and the limits they resolve to.
//!
//! The upstream product shipped with several inconsistent copies of its limit
//! constants (one page said the free character cap was 5,000, another 50,000;
//! file caps ranged from 0 to 50 MB for the same tier). [`LimitTable`]
//! resolves that by making the whole policy an explicit, named configuration:
//! the defaults below are one coherent choice, and a host that needs different
//! numbers constructs its own table instead of patching constants.
//!
//! Resolution is pure: [`LimitTable::resolve`] is a total function of
//! `(Tier, is_authenticated)` with no I/O. The tier itself comes from an
//! external store behind the [`TierLookup`] trait and is threaded into
//! [`crate::config::WorkflowConfig`] at construction — never read from
//! ambient global state — so the policy and the workflow are independently
//! testable with an injected tier.

use crate::error::ReadFastError;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// A user's subscription level, as stored by the external tier store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// No paid plan. Also the fallback when the store has no record.
    #[default]
    Free,
    Pro,
    Ultimate,
}

impl Tier {
    /// Parse the store's wire name (`free` / `pro` / `ultimate`).
    pub fn from_store_name(name: &str) -> Option<Self> {
        match name {
            "free" => Some(Tier::Free),
            "pro" => Some(Tier::Pro),
            "ultimate" => Some(Tier::Ultimate),
            _ => None,
        }
    }
}

/// Concrete caps derived from a tier and authentication state.
///
/// `None` means unbounded. Derived, never stored: always recompute via
/// [`LimitTable::resolve`] when the session changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitProfile {
    /// Maximum characters accepted by the text path.
    pub max_chars: Option<usize>,
    /// Maximum aggregate bytes accepted by one file batch. 0 disables the
    /// file path entirely.
    pub max_file_bytes: u64,
    /// Maximum files per batch.
    pub max_concurrent_files: Option<usize>,
}

impl LimitProfile {
    /// True when this profile admits no file conversion at all.
    pub fn files_disabled(&self) -> bool {
        self.max_file_bytes == 0
    }
}

const MB: u64 = 1024 * 1024;

/// The limit policy, one row per condition.
///
/// | condition              | max_chars | max_file_bytes | max files |
/// |------------------------|-----------|----------------|-----------|
/// | unauthenticated        | 5,000     | 0 (disabled)   | 1         |
/// | authenticated free     | 50,000    | 10 MB          | 1         |
/// | authenticated pro      | 50,000    | 50 MB          | unbounded |
/// | authenticated ultimate | unbounded | 100 MB         | unbounded |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitTable {
    pub unauthenticated: LimitProfile,
    pub free: LimitProfile,
    pub pro: LimitProfile,
    pub ultimate: LimitProfile,
}

impl Default for LimitTable {
    fn default() -> Self {
        Self {
            unauthenticated: LimitProfile {
                max_chars: Some(5_000),
                max_file_bytes: 0,
                max_concurrent_files: Some(1),
            },
            free: LimitProfile {
                max_chars: Some(50_000),
                max_file_bytes: 10 * MB,
                max_concurrent_files: Some(1),
            },
            pro: LimitProfile {
                max_chars: Some(50_000),
                max_file_bytes: 50 * MB,
                max_concurrent_files: None,
            },
            ultimate: LimitProfile {
                max_chars: None,
                max_file_bytes: 100 * MB,
                max_concurrent_files: None,
            },
        }
    }
}

impl LimitTable {
    /// Resolve the caps for a session. Pure and total.
    ///
    /// An unauthenticated session gets the restricted row regardless of any
    /// tier value the caller passes along with it.
    pub fn resolve(&self, tier: Tier, is_authenticated: bool) -> LimitProfile {
        if !is_authenticated {
            return self.unauthenticated;
        }
        match tier {
            Tier::Free => self.free,
            Tier::Pro => self.pro,
            Tier::Ultimate => self.ultimate,
        }
    }
}

// ── External tier store ──────────────────────────────────────────────────

/// Boundary to the external store that maps user ids to tiers.
///
/// Implementations wrap whatever relational store the host uses. The library
/// only needs two operations: a point lookup and an idempotent "make sure a
/// free record exists" upsert for first-seen users.
#[async_trait::async_trait]
pub trait TierLookup: Send + Sync {
    /// Current tier for the user, or `None` when the store has no record.
    async fn tier_for_user(&self, user_id: &str) -> Result<Option<Tier>, ReadFastError>;

    /// Create a durable `free` record for the user. Must be idempotent:
    /// calling it for an existing user is a no-op, never an error or a
    /// duplicate row.
    async fn ensure_free(&self, user_id: &str) -> Result<(), ReadFastError>;
}

/// Resolve a user's tier, defaulting missing records to [`Tier::Free`].
///
/// When the store has no record, a durable free record is upserted so the
/// next lookup hits. An upsert failure is logged but does not fail the
/// resolution — the user still gets `Free` for this request.
pub async fn resolve_tier(store: &dyn TierLookup, user_id: &str) -> Result<Tier, ReadFastError> {
    match store.tier_for_user(user_id).await? {
        Some(tier) => Ok(tier),
        None => {
            tracing::debug!("no tier record for user {user_id}, defaulting to free");
            if let Err(e) = store.ensure_free(user_id).await {
                tracing::warn!("failed to upsert free tier record for {user_id}: {e}");
            }
            Ok(Tier::Free)
        }
    }
}

/// A [`TierLookup`] over a fixed in-memory map. Useful in tests and demos,
/// and as the lookup for hosts that resolve tiers out of band.
#[derive(Debug, Default)]
pub struct FixedTierLookup {
    records: std::sync::Mutex<std::collections::HashMap<String, Tier>>,
}

impl FixedTierLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user_id: impl Into<String>, tier: Tier) -> Self {
        self.records.lock().unwrap().insert(user_id.into(), tier);
        self
    }
}

#[async_trait::async_trait]
impl TierLookup for FixedTierLookup {
    async fn tier_for_user(&self, user_id: &str) -> Result<Option<Tier>, ReadFastError> {
        Ok(self.records.lock().unwrap().get(user_id).copied())
    }

    async fn ensure_free(&self, user_id: &str) -> Result<(), ReadFastError> {
        self.records
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_insert(Tier::Free);
        Ok(())
    }
}

// ── Session state feed ───────────────────────────────────────────────────

/// Authentication state plus resolved tier for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub authenticated: bool,
    pub tier: Tier,
}

impl SessionState {
    /// A signed-out session.
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            tier: Tier::Free,
        }
    }

    /// A signed-in session at the given tier.
    pub fn signed_in(tier: Tier) -> Self {
        Self {
            authenticated: true,
            tier,
        }
    }

    /// The caps this session resolves to under `table`.
    pub fn limits(&self, table: &LimitTable) -> LimitProfile {
        table.resolve(self.tier, self.authenticated)
    }
}

/// Publisher side of session-change notifications.
///
/// Auth events arrive from the host (sign-in, sign-out, tier refresh); the
/// feed fans the new [`SessionState`] out to any number of subscribers over a
/// watch channel. Subscribing returns a plain `watch::Receiver`; dropping the
/// receiver unsubscribes — no teardown hooks to forget.
#[derive(Debug)]
pub struct SessionFeed {
    tx: watch::Sender<SessionState>,
}

impl SessionFeed {
    pub fn new(initial: SessionState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Push a new session state to all subscribers.
    pub fn publish(&self, state: SessionState) {
        // send_replace never fails even with zero subscribers.
        self.tx.send_replace(state);
    }

    /// Subscribe to session changes. The receiver observes the latest state
    /// immediately and every subsequent publish.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Latest published state.
    pub fn current(&self) -> SessionState {
        *self.tx.borrow()
    }
}

impl Default for SessionFeed {
    fn default() -> Self {
        Self::new(SessionState::anonymous())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_row_wins_over_tier() {
        let table = LimitTable::default();
        // Even a (stale) ultimate tier gets the anonymous caps when there is
        // no session.
        let p = table.resolve(Tier::Ultimate, false);
        assert_eq!(p.max_chars, Some(5_000));
        assert!(p.files_disabled());
        assert_eq!(p.max_concurrent_files, Some(1));
    }

    #[test]
    fn default_table_matches_policy() {
        let table = LimitTable::default();

        let free = table.resolve(Tier::Free, true);
        assert_eq!(free.max_chars, Some(50_000));
        assert_eq!(free.max_file_bytes, 10 * MB);
        assert_eq!(free.max_concurrent_files, Some(1));

        let pro = table.resolve(Tier::Pro, true);
        assert_eq!(pro.max_chars, Some(50_000));
        assert_eq!(pro.max_file_bytes, 50 * MB);
        assert_eq!(pro.max_concurrent_files, None);

        let ultimate = table.resolve(Tier::Ultimate, true);
        assert_eq!(ultimate.max_chars, None);
        assert_eq!(ultimate.max_file_bytes, 100 * MB);
    }

    #[test]
    fn tier_wire_names_round_trip() {
        assert_eq!(Tier::from_store_name("free"), Some(Tier::Free));
        assert_eq!(Tier::from_store_name("pro"), Some(Tier::Pro));
        assert_eq!(Tier::from_store_name("ultimate"), Some(Tier::Ultimate));
        assert_eq!(Tier::from_store_name("enterprise"), None);

        let json = serde_json::to_string(&Tier::Ultimate).unwrap();
        assert_eq!(json, "\"ultimate\"");
        let back: Tier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Tier::Ultimate);
    }

    #[tokio::test]
    async fn resolve_tier_defaults_missing_user_to_free_and_upserts() {
        let store = FixedTierLookup::new();
        let tier = resolve_tier(&store, "user-1").await.unwrap();
        assert_eq!(tier, Tier::Free);

        // The upsert created a durable record.
        assert_eq!(store.tier_for_user("user-1").await.unwrap(), Some(Tier::Free));
    }

    #[tokio::test]
    async fn ensure_free_is_idempotent() {
        let store = FixedTierLookup::new().with_user("user-2", Tier::Pro);
        // Upserting free for an existing pro user must not downgrade or error.
        store.ensure_free("user-2").await.unwrap();
        store.ensure_free("user-2").await.unwrap();
        assert_eq!(store.tier_for_user("user-2").await.unwrap(), Some(Tier::Pro));
    }

    #[tokio::test]
    async fn session_feed_delivers_latest_state() {
        let feed = SessionFeed::default();
        let mut rx = feed.subscribe();
        assert_eq!(*rx.borrow(), SessionState::anonymous());

        feed.publish(SessionState::signed_in(Tier::Pro));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::signed_in(Tier::Pro));
        assert_eq!(feed.current().tier, Tier::Pro);

        // Dropping the receiver is the unsubscribe; publishing afterwards
        // must not panic.
        drop(rx);
        feed.publish(SessionState::anonymous());
    }
}
