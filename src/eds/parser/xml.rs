//! Owned XML element tree for EDS responses
//!
//! EDS responses are deeply nested and most branches are optional. Parsing the
//! body once into an [`XmlNode`] tree lets the normalizer walk paths and treat
//! every missing branch as an empty value instead of an error. Namespace
//! prefixes are dropped, so `<a:Record>` and `<Record>` read the same.

use quick_xml::Reader;
use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

use crate::error::{EdsError, Result};

/// One XML element with its attributes, text and children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    /// Parse a document and return its root element
    pub fn parse(xml: &str) -> Result<XmlNode> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => stack.push(Self::open(e)),
                Ok(Event::Empty(ref e)) => {
                    let node = Self::open(e);
                    Self::attach(&mut stack, &mut root, node);
                }
                Ok(Event::End(_)) => {
                    let node = stack.pop().ok_or_else(|| malformed("unbalanced end tag"))?;
                    Self::attach(&mut stack, &mut root, node);
                }
                Ok(Event::Text(ref e)) => {
                    if let Some(current) = stack.last_mut() {
                        match e.unescape_with(resolve_html5_entity) {
                            Ok(text) => current.text.push_str(&text),
                            Err(_) => current.text.push_str(&String::from_utf8_lossy(e)),
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(malformed(&e.to_string())),
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(malformed("unexpected end of document"));
        }
        root.ok_or_else(|| malformed("document has no root element"))
    }

    fn open(e: &BytesStart) -> XmlNode {
        let attributes = e
            .attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                (key, value)
            })
            .collect();

        XmlNode {
            name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            attributes,
            text: String::new(),
            children: Vec::new(),
        }
    }

    fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => {
                if root.is_none() {
                    *root = Some(node);
                }
            }
        }
    }

    /// Build a node in code (used by tests and fixtures)
    pub fn element(name: impl Into<String>) -> Self {
        XmlNode {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trimmed text content of this element (child elements excluded)
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements with the given name, in document order
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// Follow a path of child names, taking the first match at each level
    pub fn path(&self, path: &[&str]) -> Option<&XmlNode> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    /// Text of a direct child, empty when the child is absent
    pub fn child_text(&self, name: &str) -> String {
        self.child(name).map(|c| c.text().to_string()).unwrap_or_default()
    }

    /// Text at the end of a path, empty when any step is absent
    pub fn path_text(&self, path: &[&str]) -> String {
        self.path(path).map(|n| n.text().to_string()).unwrap_or_default()
    }

    /// Elements reached by following `path` and then taking every `leaf` child
    ///
    /// `node.list(&["Links"], "Link")` yields each `<Link>` under `<Links>`.
    pub fn list<'a>(&'a self, path: &[&str], leaf: &'a str) -> Vec<&'a XmlNode> {
        self.path(path)
            .map(|parent| parent.children(leaf).collect())
            .unwrap_or_default()
    }

    /// Whether the element carries neither text nor children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.text().is_empty()
    }

    /// Convert the subtree into loosely structured JSON
    ///
    /// Leaf elements become strings, repeated siblings become arrays and
    /// attributes land under `"@attributes"`.
    pub fn to_json(&self) -> Value {
        if self.children.is_empty() && self.attributes.is_empty() {
            return Value::String(self.text().to_string());
        }

        let mut map = Map::new();
        if !self.attributes.is_empty() {
            let attrs = self
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            map.insert("@attributes".to_string(), Value::Object(attrs));
        }
        for child in &self.children {
            let value = child.to_json();
            match map.get_mut(&child.name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(child.name.clone(), value);
                }
            }
        }
        if self.children.is_empty() && !self.text().is_empty() {
            map.insert("value".to_string(), Value::String(self.text().to_string()));
        }
        Value::Object(map)
    }

    /// Serialize the subtree back to compact XML (diagnostics only)
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push_str(&format!(" {}=\"{}\"", key, quick_xml::escape::escape(value.as_str())));
        }
        out.push('>');
        out.push_str(&quick_xml::escape::escape(self.text.as_str()));
        for child in &self.children {
            child.write_xml(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn malformed(message: &str) -> EdsError {
    EdsError::MalformedResponse {
        message: format!("XML parsing failed: {}", message),
    }
}
