//! Minimal XML access for SOAP messages.
//!
//! Documents are addressed by dot-separated paths of element local names, e.g.
//! `Envelope.Body.Fault.Reason.Text`. Namespace prefixes are ignored and the first
//! matching child is taken at every step.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use xmltree::Element;
use xmltree::XMLNode;

static WHITESPACE_BETWEEN_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("Invalid regex"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));

/// Compacts an XML message so that its wire form is deterministic.
///
/// Whitespace between tags is removed, other whitespace runs become a single space.
pub fn compact(message: &str) -> String {
    let message = WHITESPACE_BETWEEN_TAGS.replace_all(message.trim(), "><");
    WHITESPACE_RUN.replace_all(&message, " ").into_owned()
}

/// Escapes text for use as element content.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Not a well-formed XML document")]
    Parse(#[from] xmltree::ParseError),

    #[error("Failed to serialize an XML document")]
    Write(#[from] xmltree::Error),

    #[error("Serialized XML is not UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// A parsed XML document.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    root: Element,
}

impl XmlDocument {
    pub fn parse(data: &[u8]) -> Result<Self, XmlError> {
        let root = Element::parse(data)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Finds the element at `path`. The first segment names the root element.
    pub fn find(&self, path: &str) -> Option<&Element> {
        let mut segments = path.split('.');
        if segments.next() != Some(self.root.name.as_str()) {
            return None;
        }
        segments.try_fold(&self.root, |element, name| {
            element.children.iter().find_map(|node| match node {
                XMLNode::Element(child) if child.name == name => Some(child),
                _ => None,
            })
        })
    }

    /// Text content of the element at `path`, untrimmed.
    pub fn value_for_path(&self, path: &str) -> Option<String> {
        self.find(path)
            .and_then(|element| element.get_text())
            .map(|text| text.into_owned())
    }

    pub fn to_xml_string(&self) -> Result<String, XmlError> {
        let mut buffer = Vec::default();
        self.root.write(&mut buffer)?;
        String::from_utf8(buffer).map_err(Into::into)
    }
}
