use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{IndexerError, Result};

/// A parsed XML element tree. MODS and public XML documents are namespaced;
/// element and attribute names are stored by local name so extraction code
/// does not care which prefix the repository happened to emit.
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub text: String,
}

impl XmlNode {
    /// Parse a document into its root element.
    pub fn parse(xml: &str) -> Result<XmlNode> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    stack.push(node_from_start(&e)?);
                }
                Ok(Event::Empty(e)) => {
                    let node = node_from_start(&e)?;
                    attach(&mut stack, &mut root, node);
                }
                Ok(Event::Text(t)) => {
                    if let Some(top) = stack.last_mut() {
                        let unescaped = t
                            .unescape()
                            .map_err(|e| IndexerError::Xml(e.to_string()))?;
                        if !top.text.is_empty() && !unescaped.is_empty() {
                            top.text.push(' ');
                        }
                        top.text.push_str(unescaped.as_ref());
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(c.as_ref()));
                    }
                }
                Ok(Event::End(_)) => {
                    let node = stack.pop().ok_or_else(|| {
                        IndexerError::Xml("unbalanced closing tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, node);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(IndexerError::Xml(e.to_string())),
                _ => {}
            }
        }

        root.ok_or_else(|| IndexerError::Xml("document has no root element".to_string()))
    }

    /// Attribute value by local name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// All elements with the given local name, at any depth below this node.
    pub fn descendants<'a>(&'a self, name: &'a str) -> Vec<&'a XmlNode> {
        let mut found = Vec::new();
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            found.extend(child.descendants(name));
        }
        found
    }

    /// Text directly inside this element, trimmed.
    pub fn text_trim(&self) -> &str {
        self.text.trim()
    }

    /// Text of this element and everything below it, space-joined.
    pub fn deep_text(&self) -> String {
        let mut out = String::from(self.text.trim());
        for child in &self.children {
            let t = child.deep_text();
            if !t.is_empty() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(&t);
            }
        }
        out
    }

    /// True when the element carries no text and no children at all.
    pub fn is_empty(&self) -> bool {
        self.text_trim().is_empty() && self.children.is_empty()
    }
}

fn node_from_start(e: &quick_xml::events::BytesStart<'_>) -> Result<XmlNode> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| IndexerError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| IndexerError::Xml(e.to_string()))?
            .to_string();
        attrs.push((key, value));
    }
    Ok(XmlNode {
        name,
        attrs,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_none() {
        *root = Some(node);
    }
}
