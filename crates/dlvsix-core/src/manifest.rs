//! Reads a package's `extension.vsixmanifest` into a [`PackageManifest`].
//!
//! Only two element paths matter: `Metadata/Identity` and the extension-kind
//! `Metadata/Properties/Property`. Elements are matched by local name.

use std::collections::BTreeSet;

use dlvsix_schema::PackageManifest;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::events::attributes::AttrError;
use thiserror::Error;

/// `Id` of the property listing extension kinds.
pub const EXTENSION_KIND_PROPERTY: &str = "Microsoft.VisualStudio.Code.ExtensionKind";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Malformed manifest XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed manifest attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("Manifest identity is missing the '{0}' attribute")]
    MissingAttribute(&'static str),
}

#[derive(Debug, Default)]
struct Identity {
    id: Option<String>,
    version: Option<String>,
    publisher: Option<String>,
    target_platform: Option<String>,
}

/// Parse manifest XML.
///
/// Returns `Ok(None)` when the document has no identity node: the file is not
/// an extension package. A missing kind property yields an empty kind set.
pub fn parse_manifest(xml: &str) -> Result<Option<PackageManifest>, ManifestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // Local names of the currently open elements, root first.
    let mut stack: Vec<String> = Vec::new();
    let mut identity: Option<Identity> = None;
    let mut kinds: Option<BTreeSet<String>> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                visit(&e, &stack, &mut identity, &mut kinds)?;
                stack.push(local_name(&e));
            }
            Event::Empty(e) => visit(&e, &stack, &mut identity, &mut kinds)?,
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let Some(identity) = identity else {
        return Ok(None);
    };

    Ok(Some(PackageManifest {
        id: identity.id.ok_or(ManifestError::MissingAttribute("Id"))?,
        version: identity
            .version
            .ok_or(ManifestError::MissingAttribute("Version"))?
            .into(),
        publisher: identity
            .publisher
            .ok_or(ManifestError::MissingAttribute("Publisher"))?,
        target_platform: identity.target_platform,
        kinds: kinds.unwrap_or_default(),
    }))
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn under(stack: &[String], path: &[&str]) -> bool {
    // stack[0] is the document root; paths are relative to it.
    stack.len() == path.len() + 1 && stack[1..].iter().zip(path).all(|(a, b)| a == b)
}

fn visit(
    e: &BytesStart<'_>,
    stack: &[String],
    identity: &mut Option<Identity>,
    kinds: &mut Option<BTreeSet<String>>,
) -> Result<(), ManifestError> {
    let name = local_name(e);

    if name == "Identity" && identity.is_none() && under(stack, &["Metadata"]) {
        let mut found = Identity::default();
        for attr in e.attributes() {
            let attr = attr?;
            let value = attr.unescape_value()?.into_owned();
            match attr.key.local_name().as_ref() {
                b"Id" => found.id = Some(value),
                b"Version" => found.version = Some(value),
                b"Publisher" => found.publisher = Some(value),
                b"TargetPlatform" => found.target_platform = Some(value),
                _ => {}
            }
        }
        *identity = Some(found);
    } else if name == "Property" && kinds.is_none() && under(stack, &["Metadata", "Properties"]) {
        let mut id = None;
        let mut value = None;
        for attr in e.attributes() {
            let attr = attr?;
            match attr.key.local_name().as_ref() {
                b"Id" => id = Some(attr.unescape_value()?.into_owned()),
                b"Value" => value = Some(attr.unescape_value()?.into_owned()),
                _ => {}
            }
        }
        if id.as_deref() == Some(EXTENSION_KIND_PROPERTY) {
            *kinds = Some(
                value
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
    }
    Ok(())
}
