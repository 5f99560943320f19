//! Extension identity and version types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};

/// Error returned when an extension id is not of the form `publisher.name`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid extension id '{0}': expected 'publisher.name'")]
pub struct InvalidIdentity(pub String);

/// The stable identity of an extension across versions: `publisher.name`.
///
/// Equality and hashing are case-insensitive. The original casing is kept for
/// display, [`key`](Self::key) yields the lower-cased canonical form.
///
/// # Example
///
/// ```
/// use dlvsix_schema::ExtensionIdentity;
///
/// let a: ExtensionIdentity = "MS-Python.Python".parse().unwrap();
/// let b = ExtensionIdentity::new("ms-python", "python");
/// assert_eq!(a, b);
/// assert_eq!(a.key(), "ms-python.python");
/// ```
#[derive(Debug, Clone)]
pub struct ExtensionIdentity {
    publisher: String,
    name: String,
}

impl ExtensionIdentity {
    /// Create an identity from its two parts.
    pub fn new(publisher: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            publisher: publisher.into(),
            name: name.into(),
        }
    }

    /// The publisher part, as given.
    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    /// The name part, as given.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical lower-cased `publisher.name`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.publisher, self.name).to_lowercase()
    }
}

impl PartialEq for ExtensionIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ExtensionIdentity {}

impl Hash for ExtensionIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for ExtensionIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ExtensionIdentity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl std::fmt::Display for ExtensionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.publisher, self.name)
    }
}

impl std::str::FromStr for ExtensionIdentity {
    type Err = InvalidIdentity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('.') {
            Some((publisher, name)) if !publisher.is_empty() && !name.is_empty() => {
                Ok(Self::new(publisher, name))
            }
            _ => Err(InvalidIdentity(s.to_string())),
        }
    }
}

impl Serialize for ExtensionIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key())
    }
}

impl<'de> Deserialize<'de> for ExtensionIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An extension version string.
///
/// Versions are opaque here: only exact equality is meaningful. Which version
/// is "newest" is decided by installation order, never by comparing versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ExtensionVersion(String);

impl ExtensionVersion {
    /// Create a version from the given string (stored as-is).
    pub fn new(v: &str) -> Self {
        Self(v.to_string())
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExtensionVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for ExtensionVersion {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ExtensionVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for ExtensionVersion {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl From<&str> for ExtensionVersion {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ExtensionVersion {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for ExtensionVersion {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ExtensionVersion {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
