// src/storage/svg_container.rs
//! Baked badge images: a signed token stored inside an SVG document.
//!
//! The token is carried by one element appended to the document root:
//!
//! ```xml
//! <openbadges:assertion xmlns:openbadges="http://openbadges.org" verify="<token>"/>
//! ```
//!
//! The namespace, element and attribute names must stay exactly as they are
//! so that previously baked images remain readable.
//!
//! Embedding streams the host document through unchanged, event by event.
//! Prolog, DOCTYPE, comments and prefixed attributes (`xlink:href`,
//! `xml:space`, editor metadata) come out exactly as they went in.

use crate::error::{BadgeError, Result};
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::{NsReader, Reader};
use quick_xml::writer::Writer;
use std::fs;
use std::path::Path;

pub const OPENBADGES_NAMESPACE: &str = "http://openbadges.org";
pub const OPENBADGES_PREFIX: &str = "openbadges";
pub const ASSERTION_ELEMENT: &str = "assertion";
pub const VERIFY_ATTRIBUTE: &str = "verify";

/// Embeds tokens into, and extracts them from, XML/SVG containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgEmbedder;

impl SvgEmbedder {
    /// Appends an `openbadges:assertion` element carrying `token` as the
    /// last child of the document root. Everything else is copied verbatim.
    ///
    /// # Errors
    /// - `ContainerNotFound` if `document` is not well-formed XML with a single root
    /// - `SigningError` if the updated document cannot be written
    pub fn embed(document: &str, token: &str) -> Result<String> {
        let mut reader = Reader::from_str(document);
        let mut writer = Writer::new(Vec::with_capacity(document.len() + token.len() + 96));
        let mut depth = 0usize;
        let mut embedded = false;

        loop {
            let event = reader.read_event().map_err(container_error)?;
            match event {
                Event::Eof => break,
                Event::Start(_) | Event::Empty(_) if depth == 0 && embedded => {
                    return Err(BadgeError::ContainerNotFound(
                        "document has more than one root element".to_string(),
                    ));
                }
                Event::Start(start) => {
                    depth += 1;
                    write_event(&mut writer, Event::Start(start))?;
                }
                Event::End(end) => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| BadgeError::ContainerNotFound("unbalanced closing tag".to_string()))?;
                    if depth == 0 {
                        write_event(&mut writer, Event::Empty(assertion_element(token)))?;
                        embedded = true;
                    }
                    write_event(&mut writer, Event::End(end))?;
                }
                Event::Empty(root) if depth == 0 => {
                    // `<svg/>` has to be opened up to take a child
                    write_event(&mut writer, Event::Start(root.borrow()))?;
                    write_event(&mut writer, Event::Empty(assertion_element(token)))?;
                    write_event(&mut writer, Event::End(root.to_end()))?;
                    embedded = true;
                }
                other => write_event(&mut writer, other)?,
            }
        }

        if depth != 0 {
            return Err(BadgeError::ContainerNotFound("unclosed root element".to_string()));
        }
        if !embedded {
            return Err(BadgeError::ContainerNotFound("document has no root element".to_string()));
        }
        String::from_utf8(writer.into_inner()).map_err(|e| BadgeError::SigningError(e.to_string()))
    }

    /// Returns the `verify` attribute of the first assertion element.
    ///
    /// The element is matched by namespace URI and local name, whatever
    /// prefix the document binds it to.
    ///
    /// # Errors
    /// - `ContainerNotFound` if `document` is not well-formed XML
    /// - `MissingAssertion` if no assertion element (or attribute) is present
    pub fn extract(document: &str) -> Result<String> {
        let mut reader = NsReader::from_str(document);
        let mut first_assertion: Option<Option<String>> = None;
        let mut depth = 0usize;
        let mut has_root = false;

        loop {
            let (namespace, event) = reader.read_resolved_event().map_err(container_error)?;
            let element = match &event {
                Event::Eof => break,
                Event::Start(element) => {
                    depth += 1;
                    Some(element)
                }
                Event::Empty(element) => Some(element),
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    None
                }
                _ => None,
            };

            if let Some(element) = element {
                has_root = true;
                if first_assertion.is_none() && is_assertion(&namespace, element) {
                    first_assertion = Some(verify_attribute(element)?);
                }
            }
        }

        if !has_root || depth != 0 {
            return Err(BadgeError::ContainerNotFound("document has no complete root element".to_string()));
        }
        first_assertion.flatten().ok_or(BadgeError::MissingAssertion)
    }

    /// Reads `input`, embeds `token`, and writes the result to `output`.
    ///
    /// # Errors
    /// `FileToSignNotExists` when `input` is missing, otherwise as [`embed`](Self::embed);
    /// write failures are `SigningError`.
    pub fn embed_file(input: &Path, output: &Path, token: &str) -> Result<()> {
        let document = read_container(input)?;
        let signed = Self::embed(&document, token)?;
        fs::write(output, signed)
            .map_err(|e| BadgeError::SigningError(format!("{}: {e}", output.display())))?;
        debug!("embedded assertion into {}", output.display());
        Ok(())
    }

    /// Reads `path` and extracts its embedded token.
    pub fn extract_file(path: &Path) -> Result<String> {
        let document = read_container(path)?;
        Self::extract(&document)
    }
}

fn assertion_element(token: &str) -> BytesStart<'static> {
    let namespace_attribute = format!("xmlns:{OPENBADGES_PREFIX}");
    let mut element = BytesStart::new(format!("{OPENBADGES_PREFIX}:{ASSERTION_ELEMENT}"));
    element.push_attribute((namespace_attribute.as_str(), OPENBADGES_NAMESPACE));
    element.push_attribute((VERIFY_ATTRIBUTE, token));
    element
}

fn is_assertion(namespace: &ResolveResult<'_>, element: &BytesStart<'_>) -> bool {
    let in_namespace = matches!(
        namespace,
        ResolveResult::Bound(Namespace(uri)) if *uri == OPENBADGES_NAMESPACE.as_bytes()
    );
    in_namespace && element.local_name().as_ref() == ASSERTION_ELEMENT.as_bytes()
}

fn verify_attribute(element: &BytesStart<'_>) -> Result<Option<String>> {
    let attribute = element
        .try_get_attribute(VERIFY_ATTRIBUTE)
        .map_err(|e| BadgeError::ContainerNotFound(e.to_string()))?;
    match attribute {
        Some(attribute) => attribute
            .unescape_value()
            .map(|value| Some(value.into_owned()))
            .map_err(container_error),
        None => Ok(None),
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| BadgeError::SigningError(e.to_string()))
}

fn container_error(err: quick_xml::Error) -> BadgeError {
    BadgeError::ContainerNotFound(err.to_string())
}

fn read_container(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(BadgeError::FileToSignNotExists(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|e| BadgeError::ContainerNotFound(format!("{}: {e}", path.display())))
}
