//! The set of extensions to fetch, read from the local editor's registry.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use dlvsix_schema::{ExtensionIdentity, ExtensionVersion, RegistryEntry};
use thiserror::Error;

use crate::paths::registry_file;

/// Extensions whose presence means the user works on remote hosts, so the
/// server build is worth fetching.
pub const REMOTING_EXTENSION_IDS: [&str; 6] = [
    "ms-vscode-remote.vscode-remote-extensionpack",
    "ms-vscode-remote.remote-wsl",
    "ms-vscode-remote.remote-ssh",
    "ms-vscode-remote.remote-containers",
    "jeanp413.open-remote-ssh",
    "jeanp413.open-remote-wsl",
];

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt extensions file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One extension to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    pub identity: ExtensionIdentity,
    pub version: ExtensionVersion,
    pub installed_timestamp: i64,
}

/// Extensions installed locally, one version each.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    items: Vec<InventoryItem>,
}

impl Inventory {
    pub fn new(items: Vec<InventoryItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether any remote-development extension is installed.
    pub fn has_remoting_extension(&self) -> bool {
        self.items
            .iter()
            .any(|i| REMOTING_EXTENSION_IDS.contains(&i.identity.key().as_str()))
    }
}

/// Read the registry of `extensions_dir`.
///
/// Ids in `ignored` (lower-cased) are left out. When an id appears more than
/// once, the most recently installed entry is kept. A missing registry is an
/// empty inventory.
pub fn load_inventory(
    extensions_dir: &Path,
    ignored: &BTreeSet<String>,
) -> Result<Inventory, InventoryError> {
    let path = registry_file(extensions_dir);
    tracing::debug!("Loading extensions from {}", path.display());

    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Inventory::default()),
        Err(source) => return Err(InventoryError::Read { path, source }),
    };
    let entries: Vec<RegistryEntry> =
        serde_json::from_str(&text).map_err(|source| InventoryError::Corrupt { path, source })?;

    let mut latest: BTreeMap<String, InventoryItem> = BTreeMap::new();
    for entry in entries {
        let identity = match entry.identifier.identity() {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Skipping registry entry: {e}");
                continue;
            }
        };
        let key = identity.key();
        if ignored.contains(&key) {
            tracing::debug!("Ignoring {key}");
            continue;
        }
        let item = InventoryItem {
            identity,
            version: entry.version,
            installed_timestamp: entry.metadata.installed_timestamp.unwrap_or(0),
        };
        // Ties go to the later entry.
        match latest.get(&key) {
            Some(prev) if prev.installed_timestamp > item.installed_timestamp => {}
            _ => {
                latest.insert(key, item);
            }
        }
    }

    Ok(Inventory::new(latest.into_values().collect()))
}

/// Parse an ignore list: one id per line, `#` starts a comment.
pub fn parse_ignore_list(text: &str) -> BTreeSet<String> {
    text.lines()
        .filter_map(|line| {
            let id = line.split('#').next().unwrap_or_default().trim();
            (!id.is_empty()).then(|| id.to_lowercase())
        })
        .collect()
}

/// Read an ignore file. A missing file ignores nothing.
pub fn read_ignore_file(path: &Path) -> Result<BTreeSet<String>, InventoryError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_ignore_list(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(source) => Err(InventoryError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
