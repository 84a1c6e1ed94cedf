//! Domain entities and value types
//!
//! This module contains the core domain types for onemirror:
//! - Newtypes for remote identifiers, content fingerprints and credentials
//! - Relative path fragments reconstructed from Graph parent references
//! - Raw change-feed entries and their decoded [`EntryKind`]
//! - Emitted sync actions and resolution errors
//! - Domain-specific error types

pub mod action;
pub mod entry;
pub mod errors;
pub mod newtypes;
pub mod path;

// Re-export commonly used types
pub use action::{ActionKind, ItemType, ResolveError, ResolveReason, SyncAction};
pub use entry::{EntryKind, FileFacet, Hashes, ParentReference, RawEntry, RemoteItem};
pub use errors::DomainError;
pub use newtypes::{Credential, DriveId, Fingerprint, RemoteId};
pub use path::RelativePath;
