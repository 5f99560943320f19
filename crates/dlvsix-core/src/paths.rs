use std::path::{Path, PathBuf};

/// Location of `product.json` relative to the editor's install directory.
pub const PRODUCT_JSON_PATH: &str = "resources/app/product.json";

/// Returns the work directory holding the caches.
///
/// `DLVSIX_HOME` overrides the default of `./vscode-extensions`.
pub fn work_dir() -> PathBuf {
    if let Ok(val) = std::env::var("DLVSIX_HOME") {
        return PathBuf::from(val);
    }
    PathBuf::from("vscode-extensions")
}

/// Extension cache root: `<work>/extensions`
pub fn extension_cache_path(work: &Path) -> PathBuf {
    work.join("extensions")
}

/// Distribution cache root: `<work>/dist`
pub fn dist_path(work: &Path) -> PathBuf {
    work.join("dist")
}

/// Ignore list next to the work directory: `<work>/../.vsixignore`
pub fn ignore_file_path(work: &Path) -> PathBuf {
    work.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(".vsixignore")
}

/// `extensions.json` inside an extensions directory.
pub fn registry_file(extensions_dir: &Path) -> PathBuf {
    extensions_dir.join("extensions.json")
}

/// `.obsolete` inside an extensions directory.
pub fn obsolete_file(extensions_dir: &Path) -> PathBuf {
    extensions_dir.join(".obsolete")
}

/// Whether this process looks like it runs on a remote host (SSH or WSL).
pub fn is_remote_session() -> bool {
    ["SSH_CLIENT", "WSL_DISTRO_NAME", "WSL_INTEROP"]
        .iter()
        .any(|v| std::env::var_os(v).is_some())
}

/// Default code home for installs: `~/.vscode-server` on a remote host, else `~/.vscode`.
///
/// Returns `None` if the user's home cannot be resolved.
pub fn default_code_home() -> Option<PathBuf> {
    let folder = if is_remote_session() {
        ".vscode-server"
    } else {
        ".vscode"
    };
    dirs::home_dir().map(|h| h.join(folder))
}

/// A code home whose directory name ends in `-server` belongs to a headless host.
pub fn is_server_home(code_home: &Path) -> bool {
    code_home
        .file_name()
        .is_some_and(|n| n.to_string_lossy().ends_with("-server"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_home_detection() {
        assert!(is_server_home(Path::new("/home/u/.vscode-server")));
        assert!(!is_server_home(Path::new("/home/u/.vscode")));
    }

    #[test]
    fn test_ignore_file_sits_beside_work_dir() {
        assert_eq!(
            ignore_file_path(Path::new("/data/vscode-extensions")),
            PathBuf::from("/data/.vsixignore")
        );
        assert_eq!(
            ignore_file_path(Path::new("vscode-extensions")),
            PathBuf::from("./.vsixignore")
        );
    }
}
