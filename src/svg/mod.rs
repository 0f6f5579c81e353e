//! Owned, mutable SVG element tree.
//!
//! The tree keeps qualified names and namespace declarations exactly as
//! written so that a parsed document serializes back into markup that any
//! SVG decoder accepts. Comments and processing instructions are dropped.

use quick_xml::escape::escape;
use std::fmt::{self, Write};
use thiserror::Error;

pub mod recolor;
pub mod viewport;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Error)]
#[error("Failed to parse SVG markup: {0}")]
pub struct ParseError(#[from] roxmltree::Error);

/// Element kinds the pipeline cares about. The first seven are the
/// geometry elements that can be hit-tested against their fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Path,
    Rect,
    Circle,
    Ellipse,
    Line,
    Polyline,
    Polygon,
    Other,
}

impl ElementKind {
    fn from_local_name(name: &str) -> Self {
        match name {
            "path" => Self::Path,
            "rect" => Self::Rect,
            "circle" => Self::Circle,
            "ellipse" => Self::Ellipse,
            "line" => Self::Line,
            "polyline" => Self::Polyline,
            "polygon" => Self::Polygon,
            _ => Self::Other,
        }
    }

    pub fn is_shape(self) -> bool {
        !matches!(self, Self::Other)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub kind: ElementKind,
    /// Namespace declarations made on this element, as `(prefix, uri)`.
    pub namespaces: Vec<(Option<String>, String)>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        let local = name.rsplit(':').next().unwrap_or(name);
        Self {
            name: name.to_string(),
            kind: ElementKind::from_local_name(local),
            namespaces: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(index).1)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Number of nodes in this subtree, this element included.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|child| match child {
                Node::Element(element) => element.node_count(),
                Node::Text(_) => 1,
            })
            .sum::<usize>()
    }

    fn write_markup(&self, out: &mut impl Write) -> fmt::Result {
        write!(out, "<{}", self.name)?;
        for (prefix, uri) in &self.namespaces {
            match prefix {
                Some(prefix) => write!(out, " xmlns:{prefix}=\"{}\"", escape(uri))?,
                None => write!(out, " xmlns=\"{}\"", escape(uri))?,
            }
        }
        for (key, value) in &self.attributes {
            write!(out, " {key}=\"{}\"", escape(value))?;
        }

        if self.children.is_empty() {
            return write!(out, "/>");
        }

        write!(out, ">")?;
        for child in &self.children {
            match child {
                Node::Element(element) => element.write_markup(out)?,
                Node::Text(text) => write!(out, "{}", escape(text))?,
            }
        }
        write!(out, "</{}>", self.name)
    }
}

/// A parsed vector document. Only the root element of the source is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let doc = roxmltree::Document::parse(text)?;
        let root = convert_element(doc.root_element(), &[]);
        Ok(Self { root })
    }

    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.root.write_markup(&mut out);
        out
    }
}

fn qualified_name(node: roxmltree::Node, namespace: Option<&str>, local: &str) -> String {
    match namespace.and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_string(),
    }
}

fn convert_element(node: roxmltree::Node, inherited: &[(Option<String>, String)]) -> Element {
    let tag = node.tag_name();
    let mut element = Element::new(&qualified_name(node, tag.namespace(), tag.name()));

    let in_scope: Vec<(Option<String>, String)> = node
        .namespaces()
        .filter(|ns| ns.uri() != XML_NAMESPACE)
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect();

    element.namespaces = in_scope
        .iter()
        .filter(|ns| !inherited.contains(ns))
        .cloned()
        .collect();

    element.attributes = node
        .attributes()
        .map(|attr| {
            (
                qualified_name(node, attr.namespace(), attr.name()),
                attr.value().to_string(),
            )
        })
        .collect();

    for child in node.children() {
        if child.is_element() {
            element
                .children
                .push(Node::Element(convert_element(child, &in_scope)));
        } else if child.is_text() {
            if let Some(text) = child.text() {
                element.children.push(Node::Text(text.to_string()));
            }
        }
    }

    element
}
