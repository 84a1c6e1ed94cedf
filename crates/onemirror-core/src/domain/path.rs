//! Relative path fragments reconstructed from Graph parent references
//!
//! The Graph API never reports an item's full path. Each entry carries a
//! `parentReference.path` whose text before the first `:` identifies the
//! drive (`/drive/root:`, `/drives/abcd/root:`, `/drives/abcd/items/efg!123:`)
//! and whose remainder is the percent-encoded parent folder. [`RelativePath`]
//! parses that remainder into decoded segments so the reconciliation engine
//! can strip namespace prefixes and join names without string surgery.

use std::fmt::{self, Display, Formatter};

/// A `/`-separated path relative to the mirror root, stored as decoded segments
///
/// The root is the empty path. Empty and `.` segments are dropped on
/// construction, so `Display` never yields leading, trailing or doubled
/// separators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RelativePath {
    segments: Vec<String>,
}

impl RelativePath {
    /// The mirror root (no segments)
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a Graph `parentReference.path`
    ///
    /// Everything up to and including the first `:` is discarded. A path
    /// without a `:` has no parent fragment and yields the root.
    ///
    /// ```
    /// use onemirror_core::domain::RelativePath;
    ///
    /// let path = RelativePath::from_parent_reference("/drive/root:/My%20Files/Docs");
    /// assert_eq!(path.to_string(), "My Files/Docs");
    /// assert!(RelativePath::from_parent_reference("/drive/root:").is_root());
    /// ```
    #[must_use]
    pub fn from_parent_reference(path: &str) -> Self {
        match path.split_once(':') {
            Some((_, fragment)) => Self::parse_encoded(fragment),
            None => Self::root(),
        }
    }

    /// Parse a percent-encoded `/`-separated fragment
    ///
    /// Each segment is decoded on its own. A segment that does not decode to
    /// valid UTF-8 is kept verbatim.
    #[must_use]
    pub fn parse_encoded(fragment: &str) -> Self {
        let segments = fragment
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(|s| match urlencoding::decode(s) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => s.to_string(),
            })
            .collect();
        Self { segments }
    }

    /// Build a path from already-decoded names, skipping empty ones
    #[must_use]
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut path = Self::root();
        for name in names {
            path.push(name);
        }
        path
    }

    /// Append a single decoded name; empty names are ignored
    pub fn push(&mut self, name: &str) {
        if !name.is_empty() && name != "." {
            self.segments.push(name.to_string());
        }
    }

    /// Returns a new path with `name` appended
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let mut path = self.clone();
        path.push(name);
        path
    }

    /// Returns a new path with all of `other`'s segments appended
    #[must_use]
    pub fn join(&self, other: &RelativePath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Remove `prefix` from the front of this path, segment by segment
    ///
    /// Returns `None` when `prefix` is not a leading run of this path's
    /// segments. Stripping a path from itself yields the root.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &RelativePath) -> Option<Self> {
        if self.segments.len() < prefix.segments.len() {
            return None;
        }
        let (head, tail) = self.segments.split_at(prefix.segments.len());
        if head != prefix.segments.as_slice() {
            return None;
        }
        Some(Self {
            segments: tail.to_vec(),
        })
    }

    /// True when `prefix` is a leading run of this path's segments
    #[must_use]
    pub fn starts_with(&self, prefix: &RelativePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// True for the mirror root
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The decoded segments
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment, if any
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

impl Display for RelativePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}
