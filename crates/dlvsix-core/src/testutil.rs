//! Package fixtures for tests.

use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;

/// Write a zip with the given `(entry name, contents)` pairs.
pub(crate) fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, contents) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// A minimal but well-formed `.vsix`.
pub(crate) struct VsixFixture {
    publisher: String,
    name: String,
    version: String,
    target_platform: Option<String>,
    kinds: Option<String>,
}

impl VsixFixture {
    pub(crate) fn new(publisher: &str, name: &str, version: &str) -> Self {
        Self {
            publisher: publisher.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            target_platform: None,
            kinds: Some("workspace".to_string()),
        }
    }

    pub(crate) fn target(mut self, platform: &str) -> Self {
        self.target_platform = Some(platform.to_string());
        self
    }

    pub(crate) fn kinds(mut self, kinds: Option<&str>) -> Self {
        self.kinds = kinds.map(str::to_string);
        self
    }

    pub(crate) fn manifest_xml(&self) -> String {
        let target = self
            .target_platform
            .as_deref()
            .map(|t| format!(r#" TargetPlatform="{t}""#))
            .unwrap_or_default();
        let kinds = self
            .kinds
            .as_deref()
            .map(|k| {
                format!(
                    r#"<Property Id="Microsoft.VisualStudio.Code.ExtensionKind" Value="{k}"/>"#
                )
            })
            .unwrap_or_default();
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<PackageManifest Version="2.0.0" xmlns="http://schemas.microsoft.com/developer/vsx-schema/2011">
  <Metadata>
    <Identity Language="en-US" Id="{}" Version="{}" Publisher="{}"{target}/>
    <Properties>{kinds}</Properties>
  </Metadata>
</PackageManifest>"#,
            self.name, self.version, self.publisher
        )
    }

    pub(crate) fn write(&self, path: &Path) {
        let package_json = format!(
            r#"{{"name":"{}","publisher":"{}","version":"{}"}}"#,
            self.name, self.publisher, self.version
        );
        write_zip(
            path,
            &[
                ("[Content_Types].xml", "<Types/>"),
                ("extension.vsixmanifest", &self.manifest_xml()),
                ("extension/package.json", &package_json),
                ("extension/out/main.js", "exports.activate = () => {};"),
            ],
        );
    }
}
