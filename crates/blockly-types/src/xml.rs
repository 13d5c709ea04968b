//! Minimal XML element tree and its text form.
//!
//! Block snapshots are kept as [`Element`] trees and flattened to text only
//! when embedded in an event record. The tree keeps attribute order and mixed
//! text/element children, which is all the block dialect needs. Namespaces,
//! processing instructions and comments are dropped on parse.

use std::io::Cursor;

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing or writing XML text.
#[derive(Error, Debug)]
pub enum XmlError {
    /// Underlying reader error (bad syntax, mismatched tags).
    #[error("xml syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),

    /// Malformed attribute.
    #[error("xml attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// Writer I/O error.
    #[error("xml write error: {0}")]
    Io(#[from] std::io::Error),

    /// Writer produced bytes that are not UTF-8.
    #[error("xml output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Input had no root element.
    #[error("xml document has no root element")]
    Empty,

    /// Input ended inside an open element.
    #[error("unclosed element <{0}>")]
    Unclosed(String),
}

/// A child of an [`Element`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element: name, ordered attributes, ordered children.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder-style child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Builder-style text child.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        self.attributes.shift_remove(key)
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Iterate child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text of direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// True when the element carries neither attributes nor children.
    pub fn is_bare(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }

    /// Flatten to XML text. Childless elements are written self-closing.
    pub fn to_text(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write_to(&mut writer)?;
        Ok(String::from_utf8(writer.into_inner().into_inner())?)
    }

    fn write_to(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<(), XmlError> {
        let start = BytesStart::new(self.name.as_str()).with_attributes(
            self.attributes
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_to(writer)?,
                Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }

    /// Parse XML text into an element tree. Whitespace-only text between
    /// elements is dropped; text inside leaf elements is kept verbatim.
    pub fn parse(text: &str) -> Result<Element, XmlError> {
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(element_from_start(&e)?),
                Event::Empty(e) => {
                    let el = element_from_start(&e)?;
                    attach(&mut stack, &mut root, el);
                }
                Event::End(_) => {
                    // The reader checks tag matching, so the stack is never
                    // empty here.
                    if let Some(el) = stack.pop() {
                        attach(&mut stack, &mut root, el);
                    }
                }
                Event::Text(t) => {
                    let t = t.unescape()?;
                    if t.trim().is_empty() {
                        continue;
                    }
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Text(t.into_owned()));
                    }
                }
                Event::CData(c) => {
                    if let Some(parent) = stack.last_mut() {
                        let bytes = c.into_inner();
                        parent
                            .children
                            .push(Node::Text(String::from_utf8_lossy(&bytes).into_owned()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            if root.is_some() && stack.is_empty() {
                break;
            }
        }

        if let Some(open) = stack.pop() {
            return Err(XmlError::Unclosed(open.name));
        }
        root.ok_or(XmlError::Empty)
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut el = Element::new(name);
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attr.unescape_value()?.into_owned();
        el.attributes.insert(key, value);
    }
    Ok(el)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}
