//! Loading the host editor's `product.json`.

use std::path::{Path, PathBuf};

use dlvsix_schema::ProductJson;
use thiserror::Error;

use crate::paths::PRODUCT_JSON_PATH;

/// `applicationName` of VSCodium, whose update API only serves the latest build.
pub const CODIUM: &str = "codium";

#[derive(Error, Debug)]
pub enum ProductError {
    #[error("No product.json at {} (is this an editor install directory?)", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Load `<code_home>/resources/app/product.json`.
pub fn load_product(code_home: &Path) -> Result<ProductJson, ProductError> {
    let path = code_home.join(PRODUCT_JSON_PATH);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProductError::NotFound(path));
        }
        Err(source) => return Err(ProductError::Read { path, source }),
    };
    serde_json::from_str(&text).map_err(|source| ProductError::Parse { path, source })
}

/// The user's extensions directory for this product: `<home>/<dataFolderName>/extensions`.
pub fn default_extensions_dir(product: &ProductJson, home: &Path) -> PathBuf {
    home.join(&product.data_folder_name).join("extensions")
}

/// Whether the update API can serve builds by commit for this product.
pub fn supports_distributions(product: &ProductJson) -> bool {
    product.application_name != CODIUM
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PRODUCT: &str = r#"{
        "nameShort": "Code",
        "applicationName": "code",
        "win32DirName": "Microsoft VS Code",
        "darwinExecutable": "VSCode",
        "version": "1.90.0",
        "commit": "89de5a8d4d6205e5b11647eb6a74844ca23d2573",
        "quality": "stable",
        "dataFolderName": ".vscode",
        "serverDataFolderName": ".vscode-server",
        "updateUrl": "https://update.code.visualstudio.com",
        "extensionsGallery": {
            "serviceUrl": "https://marketplace.visualstudio.com/_apis/public/gallery",
            "itemUrl": "https://marketplace.visualstudio.com/items"
        }
    }"#;

    #[test]
    fn test_load_product() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(PRODUCT_JSON_PATH);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, PRODUCT).unwrap();

        let product = load_product(dir.path()).unwrap();
        assert_eq!(product.application_name, "code");
        assert_eq!(
            product.gallery_url(),
            Some("https://marketplace.visualstudio.com/_apis/public/gallery")
        );
        assert!(supports_distributions(&product));
        assert_eq!(
            default_extensions_dir(&product, Path::new("/home/u")),
            PathBuf::from("/home/u/.vscode/extensions")
        );
    }

    #[test]
    fn test_missing_product_is_not_found() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_product(dir.path()),
            Err(ProductError::NotFound(_))
        ));
    }

    #[test]
    fn test_codium_has_no_distributions() {
        let mut product: ProductJson = serde_json::from_str(PRODUCT).unwrap();
        product.application_name = CODIUM.to_string();
        assert!(!supports_distributions(&product));
    }
}
