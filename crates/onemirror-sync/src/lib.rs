//! onemirror Sync - Delta reconciliation engine
//!
//! Turns the raw delta feed of a drive, plus the nested feeds of every
//! shared folder linked into it, into an ordered stream of classified
//! [`SyncAction`](onemirror_core::domain::SyncAction)s.
//!
//! ## Modules
//!
//! - [`state`] - In-memory record of tracked items and namespace subscriptions
//! - [`classifier`] - Name/type/fingerprint resolution and action classification
//! - [`namespace`] - Shared-folder detection and nested feed workers
//! - [`engine`] - The fan-in pipeline and the [`ActionStream`](engine::ActionStream)

pub mod classifier;
pub mod engine;
pub mod namespace;
pub mod state;

use thiserror::Error;

use onemirror_core::domain::RemoteId;

pub use classifier::Classifier;
pub use engine::{ActionResult, ActionStream, DeltaEngine};
pub use namespace::{Namespace, NamespaceResolver};
pub use state::{ReconciliationState, TrackedItem};

/// Failures delivered on the action stream
///
/// Resolution problems with individual entries are not errors at this level;
/// they surface as error actions. These variants cover the collaborators the
/// engine depends on.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A change feed yielded an error and stopped
    #[error(
        "Change feed for {} failed: {source:#}",
        .namespace.as_deref().unwrap_or("main drive")
    )]
    Feed {
        /// Name of the shared folder, `None` for the main feed
        namespace: Option<String>,
        source: anyhow::Error,
    },

    /// A shared folder could not be opened
    #[error("Unable to open shared folder {id}: {source:#}")]
    Namespace {
        /// ID of the link entry that referenced the folder
        id: RemoteId,
        source: anyhow::Error,
    },
}

impl EngineError {
    /// True when the error ended the main feed and with it the pipeline
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Feed { namespace: None, .. })
    }
}
