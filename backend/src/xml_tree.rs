//! A small owned element tree for the dictionary XML.
//!
//! The dictionary files are parsed with quick-xml into `XmlElement` values,
//! keeping tags, attributes (in document order) and text nodes. Comments,
//! processing instructions and the declaration are dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum XmlError {
    #[error("XML parse error at position {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("unclosed element <{0}> at end of document")]
    Unclosed(String),
    #[error("content after the document element at position {0}")]
    JunkAfterRoot(usize),
    #[error("no element found")]
    NoRoot,
    #[error("XML write error: {0}")]
    Write(String),
}

fn syntax(position: usize, err: impl std::fmt::Display) -> XmlError {
    XmlError::Syntax { position, message: err.to_string() }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        XmlElement {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The text before the first child element, verbatim.
    ///
    /// `None` only when there is no such text. Whitespace is kept.
    pub fn text(&self) -> Option<String> {
        let mut text = String::new();
        for node in &self.children {
            match node {
                XmlNode::Text(t) => text.push_str(t),
                XmlNode::Element(_) => break,
            }
        }
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child with the given tag.
    pub fn find_child(&self, name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|el| el.name == name)
    }

    /// All elements below this one in document order, not including `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self.children.iter()] }
    }

    /// First descendant with the given tag, in document order.
    pub fn find_descendant(&self, name: &str) -> Option<&XmlElement> {
        self.descendants().find(|el| el.name == name)
    }

    pub fn find_all_descendants<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.descendants().filter(move |el| el.name == name)
    }

    /// Elements matching `parent/child` anywhere below this one: every direct
    /// `child` of every descendant `parent`, in document order.
    pub fn find_all_paths<'a>(&'a self, parent: &'a str, child: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.find_all_descendants(parent)
            .flat_map(move |p| p.child_elements().filter(move |el| el.name == child))
    }
}

/// Pre-order iterator over the elements below an element.
pub struct Descendants<'a> {
    stack: Vec<std::slice::Iter<'a, XmlNode>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = match self.stack.last_mut() {
                Some(iter) => iter.next(),
                None => return None,
            };
            match next {
                Some(XmlNode::Element(el)) => {
                    self.stack.push(el.children.iter());
                    return Some(el);
                }
                Some(XmlNode::Text(_)) => {}
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Parse an XML document into its root element.
pub fn parse_xml(content: &str) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if root.is_some() {
                    return Err(XmlError::JunkAfterRoot(position));
                }
                stack.push(element_from_start(e, position)?);
            }
            Ok(Event::Empty(ref e)) => {
                if root.is_some() {
                    return Err(XmlError::JunkAfterRoot(position));
                }
                let element = element_from_start(e, position)?;
                close_element(&mut stack, &mut root, element);
            }
            Ok(Event::End(ref e)) => {
                match stack.pop() {
                    Some(element) => close_element(&mut stack, &mut root, element),
                    None => {
                        let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                        return Err(syntax(position, format!("unexpected closing tag </{}>", name)));
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|err| syntax(position, err))?;
                push_text(&mut stack, &text, position)?;
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e).to_string();
                push_text(&mut stack, &text, position)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(syntax(reader.buffer_position(), e)),
            _ => {}
        }

        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::Unclosed(open.name.clone()));
    }

    root.ok_or(XmlError::NoRoot)
}

fn element_from_start(start: &BytesStart, position: usize) -> Result<XmlElement, XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut element = XmlElement::new(name);

    for attr in start.attributes() {
        let attr = attr.map_err(|err| syntax(position, err))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value().map_err(|err| syntax(position, err))?;
        element.attributes.push((key, value.to_string()));
    }

    Ok(element)
}

fn close_element(stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None => *root = Some(element),
    }
}

fn push_text(stack: &mut [XmlElement], text: &str, position: usize) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            // Merge adjacent text and CDATA
            if let Some(XmlNode::Text(prev)) = parent.children.last_mut() {
                prev.push_str(text);
            } else {
                parent.children.push(XmlNode::Text(text.to_string()));
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(XmlError::JunkAfterRoot(position)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements_and_attributes() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <Dictionary>
                <DictionaryEntry id="SURU_1">
                    <HeadwordCtn><Headword>koira</Headword></HeadwordCtn>
                </DictionaryEntry>
            </Dictionary>"#;

        let root = parse_xml(xml).unwrap();
        assert_eq!(root.name, "Dictionary");

        let entry = root.find_child("DictionaryEntry").unwrap();
        assert_eq!(entry.attribute("id"), Some("SURU_1"));
        assert_eq!(entry.attribute("missing"), None);

        let headword = entry.find_descendant("Headword").unwrap();
        assert_eq!(headword.text().as_deref(), Some("koira"));
    }

    #[test]
    fn test_text_is_only_leading_text_verbatim() {
        let root = parse_xml("<a>  before <b>inner</b> after</a>").unwrap();
        assert_eq!(root.text().as_deref(), Some("  before "));

        let root = parse_xml("<a>\n   <b>inner</b></a>").unwrap();
        assert_eq!(root.text().as_deref(), Some("\n   "));

        let root = parse_xml("<a><b>inner</b></a>").unwrap();
        assert_eq!(root.text(), None);
        assert_eq!(parse_xml("<a/>").unwrap().text(), None);
    }

    #[test]
    fn test_entities_and_cdata_are_decoded() {
        let root = parse_xml(r#"<a t="x &amp; y">fish &amp; <![CDATA[chips]]></a>"#).unwrap();
        assert_eq!(root.attribute("t"), Some("x & y"));
        assert_eq!(root.text().as_deref(), Some("fish & chips"));
    }

    #[test]
    fn test_descendants_are_in_document_order() {
        let root = parse_xml("<r><a><b/><c/></a><d><e/></d></r>").unwrap();
        let names: Vec<&str> = root.descendants().map(|el| el.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_find_all_paths_only_matches_direct_children() {
        let root = parse_xml(
            "<r><SeeAlso><Ptr>1</Ptr><x><Ptr>no</Ptr></x></SeeAlso><SeeAlso><Ptr>2</Ptr></SeeAlso></r>"
        ).unwrap();
        let texts: Vec<String> = root.find_all_paths("SeeAlso", "Ptr")
            .filter_map(|el| el.text())
            .collect();
        assert_eq!(texts, vec!["1", "2"]);
    }

    #[test]
    fn test_mismatched_tags_are_an_error() {
        assert!(matches!(parse_xml("<a><b></a>"), Err(XmlError::Syntax { .. })));
    }

    #[test]
    fn test_unclosed_root_is_an_error() {
        assert!(parse_xml("<a><b></b>").is_err());
    }

    #[test]
    fn test_second_root_is_an_error() {
        assert!(matches!(parse_xml("<a/><b/>"), Err(XmlError::JunkAfterRoot(_))));
    }

    #[test]
    fn test_empty_document_is_an_error() {
        assert_eq!(parse_xml("  "), Err(XmlError::NoRoot));
    }
}
