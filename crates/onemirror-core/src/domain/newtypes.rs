//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for remote identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// OneDrive identifier types
// ============================================================================

/// OneDrive item ID
///
/// Format: opaque string, typically like "01BYE5RZ6QN3ZWBTUFOFD3GSPGOHDJD36K"
/// or "D4648F06C91D9D3D!54927" for personal drives. IDs are embedded in
/// request paths, so they must not contain `/` or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains path separators/whitespace
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        if id.chars().any(|c| c == '/' || c.is_whitespace()) {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

/// OneDrive drive ID
///
/// Personal drives use a 16-character hex ID, business drives a `b!`-prefixed
/// opaque string. Same character restrictions as [`RemoteId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DriveId(String);

impl DriveId {
    /// Create a new DriveId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains path separators/whitespace
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidDriveId(
                "Drive ID cannot be empty".to_string(),
            ));
        }

        if id.chars().any(|c| c == '/' || c.is_whitespace()) {
            return Err(DomainError::InvalidDriveId(format!(
                "Drive ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DriveId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DriveId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for DriveId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DriveId> for String {
    fn from(id: DriveId) -> Self {
        id.0
    }
}

// ============================================================================
// Content fingerprint
// ============================================================================

/// Normalized content hash used to detect copies
///
/// Graph reports `sha1Hash` as upper-case hex; the fingerprint is always
/// stored lower-case so equal content compares equal regardless of casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Create a new Fingerprint, normalizing the hash to lower case
    ///
    /// # Errors
    /// Returns error if the hash is empty or contains non-alphanumeric characters
    pub fn new(hash: &str) -> Result<Self, DomainError> {
        if hash.is_empty() {
            return Err(DomainError::InvalidHash("Hash cannot be empty".to_string()));
        }

        if !hash.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidHash(format!(
                "Hash is not hex encoded: {hash}"
            )));
        }

        Ok(Self(hash.to_ascii_lowercase()))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<Fingerprint> for String {
    fn from(hash: Fingerprint) -> Self {
        hash.0
    }
}

// ============================================================================
// Credential
// ============================================================================

/// Bearer credential handed to every port call
///
/// Acquiring and refreshing the credential happens outside onemirror; the
/// engine only carries it. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Create a new Credential
    ///
    /// # Errors
    /// Returns error if the token is empty or blank
    pub fn new(token: impl Into<String>) -> Result<Self, DomainError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DomainError::InvalidCredential(
                "Credential cannot be empty".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// Returns the raw secret for building an Authorization header
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
