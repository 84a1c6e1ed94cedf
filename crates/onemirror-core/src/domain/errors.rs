//! Domain error types
//!
//! This module defines error types raised when constructing validated
//! domain values from raw change-feed data.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote item ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid drive ID format
    #[error("Invalid drive ID: {0}")]
    InvalidDriveId(String),

    /// Invalid content hash
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// Empty or malformed credential
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
}
