//! Platform naming conventions of the distribution server.
//!
//! Pure mappings from a [`PlatformId`] to the query-path keys of the update
//! API and to the artifact file names the editor's own download page uses.
//! Alpine aliasing is the caller's job (see [`PlatformId::distribution_alias`]).

use dlvsix_schema::{PlatformId, ProductJson};

/// `true` for `linux-*` and `alpine-*`.
pub fn is_linux_family(platform: PlatformId) -> bool {
    platform.is_linux_family()
}

/// The platform qualifier the server build uses; there is no `darwin-x64`
/// server, only `darwin`.
fn server_qualifier(platform: PlatformId) -> &'static str {
    match platform {
        PlatformId::DarwinX64 => "darwin",
        other => other.as_str(),
    }
}

/// File name of the headless server build.
///
/// `<app>-server-<platform>-<version>.tar.gz` on Linux, `.zip` elsewhere.
pub fn server_artifact_name(platform: PlatformId, app_name: &str, version: &str) -> String {
    let ext = if is_linux_family(platform) {
        "tar.gz"
    } else {
        "zip"
    };
    format!(
        "{app_name}-server-{}-{version}.{ext}",
        server_qualifier(platform)
    )
}

/// File name of the desktop installer for `platform`.
pub fn client_artifact_name(platform: PlatformId, product: &ProductJson, version: &str) -> String {
    if platform.is_windows() {
        return format!(
            "{}-user-{platform}-{version}.exe",
            product.win32_setup_basename()
        );
    }
    if platform.is_darwin() {
        let qualifier = platform.as_str().trim_end_matches("-x64");
        return format!("{}-{qualifier}-{version}.zip", product.darwin_executable);
    }
    format!(
        "{}-stable-{platform}-{version}.tar.gz",
        product.application_name
    )
}

/// Update API key of the desktop build: Windows asks for the user installer,
/// macOS drops `-x64`.
pub fn client_distribution_key(platform: PlatformId) -> String {
    if platform.is_windows() {
        return format!("{platform}-user");
    }
    if platform.is_darwin() {
        return platform.as_str().trim_end_matches("-x64").to_string();
    }
    platform.as_str().to_string()
}

/// Update API key of the server build.
pub fn server_distribution_key(platform: PlatformId) -> String {
    format!("server-{}", server_qualifier(platform))
}

/// Update API key of the standalone CLI.
pub fn cli_distribution_key(platform: PlatformId) -> String {
    format!("cli-{platform}")
}

/// File name of the standalone CLI archive (zip on Windows).
pub fn cli_artifact_name(platform: PlatformId) -> String {
    let ext = if platform.is_windows() { "zip" } else { "tar.gz" };
    format!("vscode-cli-{platform}-cli.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> ProductJson {
        serde_json::from_str(
            r#"{
                "applicationName": "code",
                "win32DirName": "Microsoft VS Code",
                "darwinExecutable": "VSCode",
                "version": "1.90.0",
                "commit": "abc123",
                "quality": "stable",
                "dataFolderName": ".vscode",
                "serverDataFolderName": ".vscode-server"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_server_artifact_name() {
        assert_eq!(
            server_artifact_name(PlatformId::LinuxX64, "code", "1.90.0"),
            "code-server-linux-x64-1.90.0.tar.gz"
        );
        assert_eq!(
            server_artifact_name(PlatformId::DarwinX64, "code", "1.90.0"),
            "code-server-darwin-1.90.0.zip"
        );
        assert_eq!(
            server_artifact_name(PlatformId::DarwinArm64, "code", "1.90.0"),
            "code-server-darwin-arm64-1.90.0.zip"
        );
        assert_eq!(
            server_artifact_name(PlatformId::Win32X64, "code", "1.90.0"),
            "code-server-win32-x64-1.90.0.zip"
        );
    }

    #[test]
    fn test_client_artifact_name() {
        let mut p = product();
        assert_eq!(
            client_artifact_name(PlatformId::Win32Arm64, &p, "1.90.0"),
            "Microsoft VS CodeUserSetup-user-win32-arm64-1.90.0.exe"
        );
        p.win32_setup_exe_basename = Some("VSCodeUserSetup".to_string());
        assert_eq!(
            client_artifact_name(PlatformId::Win32X64, &p, "1.90.0"),
            "VSCodeUserSetup-user-win32-x64-1.90.0.exe"
        );
        assert_eq!(
            client_artifact_name(PlatformId::DarwinX64, &p, "1.90.0"),
            "VSCode-darwin-1.90.0.zip"
        );
        assert_eq!(
            client_artifact_name(PlatformId::DarwinArm64, &p, "1.90.0"),
            "VSCode-darwin-arm64-1.90.0.zip"
        );
        assert_eq!(
            client_artifact_name(PlatformId::LinuxArmhf, &p, "1.90.0"),
            "code-stable-linux-armhf-1.90.0.tar.gz"
        );
    }

    #[test]
    fn test_distribution_keys() {
        assert_eq!(client_distribution_key(PlatformId::Win32X64), "win32-x64-user");
        assert_eq!(client_distribution_key(PlatformId::DarwinX64), "darwin");
        assert_eq!(client_distribution_key(PlatformId::DarwinArm64), "darwin-arm64");
        assert_eq!(client_distribution_key(PlatformId::LinuxX64), "linux-x64");
        assert_eq!(server_distribution_key(PlatformId::DarwinX64), "server-darwin");
        assert_eq!(server_distribution_key(PlatformId::LinuxArm64), "server-linux-arm64");
        assert_eq!(cli_distribution_key(PlatformId::AlpineX64), "cli-alpine-x64");
    }

    #[test]
    fn test_cli_artifact_name() {
        assert_eq!(
            cli_artifact_name(PlatformId::Win32X64),
            "vscode-cli-win32-x64-cli.zip"
        );
        assert_eq!(
            cli_artifact_name(PlatformId::LinuxX64),
            "vscode-cli-linux-x64-cli.tar.gz"
        );
    }
}
