//! Union schema of tag nesting across the corpus.
//!
//! A `TagStructure` maps each child tag name to the structure found below it.
//! Keys are kept in a `BTreeMap`, so equality and the rendered template do not
//! depend on the order entries were seen in.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::xml_tree::XmlElement;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagStructure {
    children: BTreeMap<String, TagStructure>,
}

impl TagStructure {
    pub fn new() -> Self {
        TagStructure::default()
    }

    /// Adds (merging) a child tag. Used to build expected structures.
    pub fn with_child(mut self, tag: &str, child: TagStructure) -> Self {
        self.children.entry(tag.to_string())
            .or_default()
            .merge_from(child);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Structure below `element`: every distinct child tag, mapped to the
    /// merged structure of all children with that tag.
    pub fn collect(element: &XmlElement) -> Self {
        let mut structure = TagStructure::new();
        for child in element.child_elements() {
            let child_structure = TagStructure::collect(child);
            structure.children.entry(child.name.clone())
                .or_default()
                .merge_from(child_structure);
        }
        structure
    }

    /// Union of two structures. Idempotent, commutative and associative.
    pub fn merge(&self, other: &TagStructure) -> TagStructure {
        let mut merged = self.clone();
        merged.merge_from(other.clone());
        merged
    }

    /// In-place form of `merge`, used when folding a corpus.
    pub fn merge_from(&mut self, other: TagStructure) {
        for (tag, sub) in other.children {
            self.children.entry(tag)
                .or_default()
                .merge_from(sub);
        }
    }

    /// Renders each tag as an open/close line pair, two spaces per level.
    pub fn write_template(&self, out: &mut String, indent: usize) {
        let spacing = "  ".repeat(indent);
        for (tag, children) in &self.children {
            let _ = writeln!(out, "{}<{}>", spacing, tag);
            children.write_template(out, indent + 1);
            let _ = writeln!(out, "{}</{}>", spacing, tag);
        }
    }

    /// The template document, with this structure below `root_tag`.
    pub fn to_template_document(&self, root_tag: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "<{}>", root_tag);
        self.write_template(&mut out, 1);
        let _ = writeln!(out, "</{}>", root_tag);
        out
    }
}
