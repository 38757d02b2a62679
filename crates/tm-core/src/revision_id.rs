//! Strongly-typed revision id wrapper.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Strongly-typed wrapper for revision ids.
///
/// Prevents accidental mixing of revision ids with branch labels, table
/// names, or other string types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    /// Create a new `RevisionId`, panicking in debug builds if the id is empty.
    ///
    /// Prefer [`try_new`](Self::try_new) when handling untrusted input.
    pub fn new(id: impl Into<String>) -> Self {
        let s = id.into();
        debug_assert!(!s.is_empty(), "RevisionId must not be empty");
        Self(s)
    }

    /// Try to create a new `RevisionId`, returning `None` if the id is empty.
    pub fn try_new(id: impl Into<String>) -> Option<Self> {
        let s = id.into();
        if s.is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    /// Return the underlying id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RevisionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for RevisionId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RevisionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for RevisionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RevisionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for RevisionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RevisionId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for RevisionId {
    fn eq(&self, other: &String) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_id_creation() {
        let id = RevisionId::new("ae1027a6acf");
        assert_eq!(id.as_str(), "ae1027a6acf");
    }

    #[test]
    fn test_revision_id_display() {
        let id = RevisionId::new("ae1027a6acf");
        assert_eq!(format!("{}", id), "ae1027a6acf");
    }

    #[test]
    fn test_revision_id_deref() {
        let id = RevisionId::new("ae1027a6acf");
        assert!(id.starts_with("ae10"));
    }

    #[test]
    fn test_revision_id_equality() {
        let id = RevisionId::new("ae1027a6acf");
        assert_eq!(id, "ae1027a6acf");
        assert_eq!(id, "ae1027a6acf".to_string());
    }

    #[test]
    fn test_revision_id_try_new_empty() {
        assert!(RevisionId::try_new("").is_none());
        assert!(RevisionId::try_new("a").is_some());
    }

    #[test]
    fn test_revision_id_borrow() {
        use std::collections::BTreeSet;
        let mut set = BTreeSet::new();
        set.insert(RevisionId::new("abc"));
        // Lookup by &str thanks to Borrow<str>
        assert!(set.contains("abc"));
    }

    #[test]
    fn test_revision_id_serde_roundtrip() {
        let id = RevisionId::new("ae1027a6acf");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""ae1027a6acf""#);
        let back: RevisionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
