//! The host editor's `product.json` records.

use serde::{Deserialize, Serialize};

/// The `extensionsGallery` section of `product.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionsGallery {
    /// Base URL of the marketplace gallery API.
    pub service_url: String,
}

/// The subset of the host editor's `resources/app/product.json` dlvsix reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductJson {
    /// Executable/application name (`code`, `code-insiders`, `codium`).
    pub application_name: String,
    /// Base name of the Windows user-setup installer, if it differs from the default.
    #[serde(default)]
    pub win32_setup_exe_basename: Option<String>,
    /// Windows install directory name (`Microsoft VS Code`).
    pub win32_dir_name: String,
    /// macOS executable base name.
    pub darwin_executable: String,
    /// Editor version.
    pub version: String,
    /// Build commit; distribution artifacts are keyed by it.
    pub commit: String,
    /// Release quality (`stable`, `insider`).
    pub quality: String,
    /// Name of the per-user data folder (`.vscode`).
    pub data_folder_name: String,
    /// Name of the server data folder (`.vscode-server`).
    pub server_data_folder_name: String,
    /// Base URL of the update/distribution API.
    #[serde(default)]
    pub update_url: Option<String>,
    /// Marketplace configuration.
    #[serde(default)]
    pub extensions_gallery: Option<ExtensionsGallery>,
}

impl ProductJson {
    /// Default base name of the Windows installer: `<win32DirName>UserSetup`,
    /// unless `win32SetupExeBasename` overrides it.
    pub fn win32_setup_basename(&self) -> String {
        self.win32_setup_exe_basename
            .clone()
            .unwrap_or_else(|| format!("{}UserSetup", self.win32_dir_name))
    }

    /// Marketplace service URL, if configured.
    pub fn gallery_url(&self) -> Option<&str> {
        self.extensions_gallery
            .as_ref()
            .map(|g| g.service_url.as_str())
    }
}
