//! Pretty-printed mirror of the source XML files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::xml_tree::{XmlElement, XmlError, XmlNode};

const INDENT_SIZE: usize = 4;

/// Renders the tree with 4-space indentation and an XML declaration.
///
/// Text nodes are trimmed and whitespace-only text is dropped, so re-parsing
/// the output gives the same tags, attributes and text up to whitespace.
pub fn to_pretty_string(root: &XmlElement) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_SIZE);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| XmlError::Write(e.to_string()))?;
    write_element(&mut writer, root)?;

    let mut s = String::from_utf8(writer.into_inner())
        .map_err(|e| XmlError::Write(e.to_string()))?;
    s.push('\n');
    Ok(s)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let has_content = element.children.iter().any(|node| match node {
        XmlNode::Element(_) => true,
        XmlNode::Text(t) => !t.trim().is_empty(),
    });

    if !has_content {
        return writer.write_event(Event::Empty(start))
            .map_err(|e| XmlError::Write(e.to_string()));
    }

    writer.write_event(Event::Start(start))
        .map_err(|e| XmlError::Write(e.to_string()))?;

    for node in &element.children {
        match node {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    writer.write_event(Event::Text(BytesText::new(text)))
                        .map_err(|e| XmlError::Write(e.to_string()))?;
                }
            }
        }
    }

    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| XmlError::Write(e.to_string()))
}

/// Writes the pretty form of `root` to `output_dir/<file_name>`.
pub fn save_xml_pretty(root: &XmlElement, file_name: &str, output_dir: &Path) -> Result<PathBuf> {
    let pretty = to_pretty_string(root)
        .with_context(|| format!("Failed to render {}", file_name))?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let output_path = output_dir.join(file_name);
    fs::write(&output_path, pretty)
        .with_context(|| format!("Failed to write {:?}", output_path))?;

    Ok(output_path)
}
