//! Action classification
//!
//! Turns one entry, raw or tagged with a [`Namespace`], into exactly one
//! [`SyncAction`] and updates the [`ReconciliationState`] to match.
//!
//! ## Decision order
//!
//! 1. Resolve the name: from the parent path when there is one, otherwise
//!    from the tracked record. No name is an error action.
//! 2. Decode the kind. An entry with no recognizable facet is an error action.
//! 3. Deleted entries stop being tracked and become `remove`.
//! 4. Tracked ids become `move` when the name changed, `change` otherwise.
//! 5. New ids become `copy` when a tracked item has the same fingerprint,
//!    `add` otherwise.
//!
//! Error actions never touch the state, so a later entry for the same id
//! gets a fresh attempt.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use onemirror_core::domain::{
    ActionKind, Credential, EntryKind, Fingerprint, ItemType, RawEntry, RelativePath,
    ResolveError, ResolveReason, SyncAction,
};
use onemirror_core::ports::{DownloadHandle, DownloadResolver};

use crate::namespace::Namespace;
use crate::state::ReconciliationState;

/// Resolves the mirror path of `entry`
///
/// Returns `None` when the entry has no parent path and its id is not
/// tracked.
pub fn resolve_name(
    state: &ReconciliationState,
    entry: &RawEntry,
    namespace: Option<&Namespace>,
) -> Option<String> {
    let Some(parent) = entry.parent_path() else {
        return state.get(&entry.id).map(|item| item.name.clone());
    };

    let fragment = RelativePath::from_parent_reference(parent);
    let path = match namespace {
        Some(ns) => ns.resolve_parent(&fragment).child(&entry.name),
        None => fragment.child(&entry.name),
    };
    Some(path.to_string())
}

/// Classifies entries against a [`ReconciliationState`]
pub struct Classifier {
    credential: Credential,
    downloads: Arc<dyn DownloadResolver>,
}

impl Classifier {
    /// Creates a classifier whose download handles use `credential`
    pub fn new(credential: Credential, downloads: Arc<dyn DownloadResolver>) -> Self {
        Self {
            credential,
            downloads,
        }
    }

    /// Produces the action for `entry` and applies it to `state`
    pub fn classify(
        &self,
        state: &mut ReconciliationState,
        entry: &RawEntry,
        namespace: Option<&Namespace>,
    ) -> SyncAction {
        let name = resolve_name(state, entry, namespace).unwrap_or_default();
        if name.is_empty() {
            return error_action(entry, &name, ResolveReason::MissingName);
        }

        let (item_type, hash) = match entry.kind() {
            EntryKind::File { fingerprint } => (ItemType::File, fingerprint),
            EntryKind::Folder => (ItemType::Folder, None),
            EntryKind::Unresolved => {
                return error_action(entry, &name, ResolveReason::UnknownType);
            }
        };

        let kind = if entry.is_deleted() {
            state.untrack(&entry.id);
            ActionKind::Remove
        } else {
            let kind = decide(state, entry, &name, hash.as_ref());
            state.track(entry.id.clone(), name.clone(), hash.clone());
            kind
        };

        debug!(
            action = kind.label(),
            id = %entry.id,
            name = %name,
            namespace = namespace.map(Namespace::name),
            "Classified entry"
        );

        SyncAction {
            kind,
            id: entry.id.clone(),
            item_type,
            name,
            modified: entry.last_modified_date_time,
            hash,
            download: self.download_handle(entry),
        }
    }

    fn download_handle(&self, entry: &RawEntry) -> Option<DownloadHandle> {
        entry.download_url.as_ref()?;
        Some(DownloadHandle::new(
            Arc::clone(&self.downloads),
            self.credential.clone(),
            entry.id.clone(),
            entry.drive_id().cloned(),
        ))
    }
}

/// Chooses between move, change, copy and add for a live entry
fn decide(
    state: &ReconciliationState,
    entry: &RawEntry,
    name: &str,
    hash: Option<&Fingerprint>,
) -> ActionKind {
    if let Some(existing) = state.get(&entry.id) {
        if existing.name != name {
            return ActionKind::Move {
                old_name: existing.name.clone(),
            };
        }
        return ActionKind::Change;
    }

    match hash.and_then(|fp| state.find_by_fingerprint(fp, &entry.id)) {
        Some((source, item)) => {
            trace!(id = %entry.id, source = %source, "Content matches tracked item");
            ActionKind::Copy {
                from: item.name.clone(),
            }
        }
        None => ActionKind::Add,
    }
}

fn error_action(entry: &RawEntry, name: &str, reason: ResolveReason) -> SyncAction {
    let error = ResolveError::new(entry, name, reason);
    warn!(id = %entry.id, filename = %error.filename, %reason, "Unable to resolve entry");
    SyncAction {
        id: entry.id.clone(),
        item_type: ItemType::Unknown,
        name: error.filename.clone(),
        kind: ActionKind::Error { error },
        modified: None,
        hash: None,
        download: None,
    }
}
