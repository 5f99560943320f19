//! Records of the host editor's extension registry.
//!
//! Two files live in an extensions directory:
//!
//! - `extensions.json`: an ordered array of [`RegistryEntry`]
//! - `.obsolete`: an object mapping `"<id>-<version>"` to `true` ([`ObsoleteLog`])
//!
//! The host editor reads and writes both files itself, so every record keeps
//! keys it does not know about in a flattened `extra` map and writes them back
//! unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ExtensionIdentity, ExtensionVersion};

/// Value of the `source` metadata field for packages installed from a file.
pub const SOURCE_VSIX: &str = "vsix";

/// One installed extension as recorded in `extensions.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// Which extension this is.
    pub identifier: RegistryIdentifier,
    /// Exact installed version.
    pub version: ExtensionVersion,
    /// Absolute location of the extracted extension, as a URI record.
    pub location: ExtensionLocation,
    /// Directory name relative to the extensions root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_location: Option<String>,
    /// Installation metadata.
    #[serde(default)]
    pub metadata: EntryMetadata,
    /// Keys this crate does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegistryEntry {
    /// Build the entry for a package installed from a `.vsix` file.
    ///
    /// The entry is pinned and tagged with source `vsix`, so the host editor
    /// does not try to auto-update it from the marketplace.
    pub fn from_vsix(
        identity: &ExtensionIdentity,
        version: ExtensionVersion,
        location: ExtensionLocation,
        relative_location: String,
        installed_timestamp: i64,
    ) -> Self {
        Self {
            identifier: RegistryIdentifier::new(identity),
            version,
            location,
            relative_location: Some(relative_location),
            metadata: EntryMetadata {
                is_application_scoped: Some(false),
                is_machine_scoped: Some(false),
                is_builtin: Some(false),
                installed_timestamp: Some(installed_timestamp),
                target_platform: None,
                pinned: Some(true),
                source: Some(SOURCE_VSIX.to_string()),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    /// Whether this entry records `identity` (case-insensitive).
    pub fn is_for(&self, identity: &ExtensionIdentity) -> bool {
        self.identifier.key() == identity.key()
    }

    /// Key of this entry in the [`ObsoleteLog`]: `"<id>-<version>"`, lower-cased.
    pub fn obsolete_key(&self) -> String {
        obsolete_key(&self.identifier.id, &self.version)
    }
}

/// Build an [`ObsoleteLog`] key from an id and version.
pub fn obsolete_key(id: &str, version: &str) -> String {
    format!("{id}-{version}").to_lowercase()
}

/// The `identifier` object of a [`RegistryEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryIdentifier {
    /// `publisher.name` as written by the host editor.
    pub id: String,
    /// Marketplace UUID, when the host editor knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Keys this crate does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegistryIdentifier {
    /// Identifier for `identity`, stored in canonical lower-case form.
    pub fn new(identity: &ExtensionIdentity) -> Self {
        Self {
            id: identity.key(),
            uuid: None,
            extra: Map::new(),
        }
    }

    /// Canonical lower-cased id.
    pub fn key(&self) -> String {
        self.id.to_lowercase()
    }

    /// Parse the id into an [`ExtensionIdentity`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdentity`](crate::InvalidIdentity) if the id has no `.` separator.
    pub fn identity(&self) -> Result<ExtensionIdentity, crate::InvalidIdentity> {
        self.id.parse()
    }
}

/// A serialized URI record, as the host editor writes it (`{"$mid":1,...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionLocation {
    /// Marshalling marker; the host editor writes `1` for URIs.
    #[serde(rename = "$mid", default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<u32>,
    /// Percent-encoded URI path.
    pub path: String,
    /// URI scheme, normally `file`.
    pub scheme: String,
    /// Keys this crate does not model (`fsPath`, `external`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtensionLocation {
    /// A `file` URI record for an already percent-encoded absolute path.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            mid: Some(1),
            path: path.into(),
            scheme: "file".to_string(),
            extra: Map::new(),
        }
    }
}

/// The `metadata` object of a [`RegistryEntry`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    /// Installed for all profiles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_application_scoped: Option<bool>,
    /// Installed per machine rather than per user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_machine_scoped: Option<bool>,
    /// Shipped with the editor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_builtin: Option<bool>,
    /// Installation time in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_timestamp: Option<i64>,
    /// Platform of the installed package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_platform: Option<String>,
    /// Excluded from auto-update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    /// Where the package came from (`gallery`, `vsix`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Keys this crate does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `.obsolete` file: entries the host editor must skip on load.
///
/// A key present with `true` means the matching [`RegistryEntry`] is still in
/// `extensions.json` but has been superseded. Keys keep the order the host
/// editor wrote them in; new keys are appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObsoleteLog(Map<String, Value>);

impl ObsoleteLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is marked obsolete.
    pub fn is_obsolete(&self, key: &str) -> bool {
        self.0
            .get(&key.to_lowercase())
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Whether `entry` is marked obsolete.
    pub fn is_entry_obsolete(&self, entry: &RegistryEntry) -> bool {
        self.is_obsolete(&entry.obsolete_key())
    }

    /// Mark `key` obsolete. Returns `true` if the log changed.
    pub fn mark(&mut self, key: &str) -> bool {
        self.0.insert(key.to_lowercase(), Value::Bool(true)) != Some(Value::Bool(true))
    }

    /// Drop `key` from the log. Returns `true` if it was present.
    pub fn unmark(&mut self, key: &str) -> bool {
        self.0.shift_remove(&key.to_lowercase()).is_some()
    }

    /// Number of keys in the log (obsolete or not).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the log has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, obsolete)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_bool().unwrap_or(false)))
    }
}
