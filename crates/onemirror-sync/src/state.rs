//! Reconciliation state
//!
//! The authoritative in-memory record the engine classifies against:
//! the last resolved name and fingerprint of every live item, and the
//! cancellation handle of every open shared-folder subscription.
//!
//! The state is owned by the single consumer task of the engine and is never
//! shared, so it needs no locking. It is not persisted; a fresh engine
//! rebuilds it from the first full delta pass.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tokio_util::sync::CancellationToken;

use onemirror_core::domain::{Fingerprint, RemoteId};

/// Last known name and fingerprint of a live item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedItem {
    /// Resolved path relative to the mirror root
    pub name: String,
    /// Normalized content fingerprint, files only
    pub hash: Option<Fingerprint>,
}

/// Tracked items plus active namespace subscriptions
#[derive(Debug, Default)]
pub struct ReconciliationState {
    tracked: BTreeMap<RemoteId, TrackedItem>,
    /// Fingerprint -> ids carrying it, kept in step with `tracked`
    by_fingerprint: BTreeMap<Fingerprint, BTreeSet<RemoteId>>,
    subscriptions: HashMap<RemoteId, CancellationToken>,
}

impl ReconciliationState {
    /// Creates an empty state
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Tracked items
    // ========================================================================

    /// The tracked record for `id`
    pub fn get(&self, id: &RemoteId) -> Option<&TrackedItem> {
        self.tracked.get(id)
    }

    /// True when `id` is tracked
    pub fn is_tracked(&self, id: &RemoteId) -> bool {
        self.tracked.contains_key(id)
    }

    /// Number of tracked items
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    /// Iterates tracked items in id order
    pub fn iter(&self) -> impl Iterator<Item = (&RemoteId, &TrackedItem)> {
        self.tracked.iter()
    }

    /// Records `id` under `name` and `hash`, replacing any earlier record
    pub fn track(&mut self, id: RemoteId, name: String, hash: Option<Fingerprint>) {
        let stale = self
            .tracked
            .get(&id)
            .and_then(|previous| previous.hash.clone())
            .filter(|old| Some(old) != hash.as_ref());
        if let Some(old) = stale {
            self.unindex(&old, &id);
        }
        if let Some(fingerprint) = &hash {
            self.by_fingerprint
                .entry(fingerprint.clone())
                .or_default()
                .insert(id.clone());
        }
        self.tracked.insert(id, TrackedItem { name, hash });
    }

    /// Stops tracking `id`, returning its last record
    pub fn untrack(&mut self, id: &RemoteId) -> Option<TrackedItem> {
        let removed = self.tracked.remove(id)?;
        if let Some(fingerprint) = &removed.hash {
            self.unindex(fingerprint, id);
        }
        Some(removed)
    }

    /// Finds a tracked item other than `exclude` with the given fingerprint
    ///
    /// When several match, the one with the smallest id wins.
    pub fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
        exclude: &RemoteId,
    ) -> Option<(&RemoteId, &TrackedItem)> {
        self.by_fingerprint
            .get(fingerprint)?
            .iter()
            .find(|id| *id != exclude)
            .and_then(|id| self.tracked.get_key_value(id))
    }

    fn unindex(&mut self, fingerprint: &Fingerprint, id: &RemoteId) {
        if let Some(ids) = self.by_fingerprint.get_mut(fingerprint) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_fingerprint.remove(fingerprint);
            }
        }
    }

    // ========================================================================
    // Namespace subscriptions
    // ========================================================================

    /// True when a subscription is reserved for the link entry `id`
    pub fn has_subscription(&self, id: &RemoteId) -> bool {
        self.subscriptions.contains_key(id)
    }

    /// Number of reserved subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Reserves a subscription slot for `id`
    ///
    /// Returns `false` and leaves the existing reservation untouched when one
    /// is already present.
    pub fn reserve_subscription(&mut self, id: RemoteId, token: CancellationToken) -> bool {
        if self.subscriptions.contains_key(&id) {
            return false;
        }
        self.subscriptions.insert(id, token);
        true
    }

    /// Cancels and releases the subscription for `id`
    ///
    /// Returns `true` when there was one.
    pub fn cancel_subscription(&mut self, id: &RemoteId) -> bool {
        match self.subscriptions.remove(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}
