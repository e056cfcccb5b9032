// src/xml.rs
//! Namespace-agnostic view over an XML document.
//!
//! Ownership documents keep their field names stable but prefix them with
//! whatever namespace alias the filer's software chose. We parse the whole
//! document into a small node tree keyed by *local* tag names, so lookups
//! ignore any `ns:` prefix, and value wrappers (`<shares><value>10</value>`)
//! can be unwrapped uniformly.

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    /// Local element name, namespace prefix stripped.
    pub name: String,
    /// Concatenated direct text content, trimmed.
    pub text: String,
    pub children: Vec<XmlNode>,
}

/// Parse a document into a synthetic root node holding the top-level
/// elements. Fails on malformed XML; callers treat that as an unusable
/// candidate, not a batch error.
pub fn parse(doc: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(doc);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = vec![XmlNode::default()];
    loop {
        match reader.read_event().context("reading xml event")? {
            Event::Start(e) => {
                let name = local_name(e.local_name().as_ref())?;
                stack.push(XmlNode {
                    name,
                    ..XmlNode::default()
                });
            }
            Event::Empty(e) => {
                let name = local_name(e.local_name().as_ref())?;
                let node = XmlNode {
                    name,
                    ..XmlNode::default()
                };
                push_child(&mut stack, node);
            }
            Event::Text(t) => {
                let txt = t.unescape().context("unescaping xml text")?;
                append_text(&mut stack, txt.trim());
            }
            Event::CData(c) => {
                let raw = String::from_utf8_lossy(&c).to_string();
                append_text(&mut stack, raw.trim());
            }
            Event::End(_) => {
                // The synthetic root never gets an End event for itself, so
                // the stack cannot underflow on well-formed input.
                if stack.len() > 1 {
                    let done = stack.pop().unwrap_or_default();
                    push_child(&mut stack, done);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // Unclosed elements: fold whatever is left into the root.
    while stack.len() > 1 {
        let done = stack.pop().unwrap_or_default();
        push_child(&mut stack, done);
    }
    Ok(stack.pop().unwrap_or_default())
}

fn local_name(raw: &[u8]) -> Result<String> {
    Ok(std::str::from_utf8(raw)
        .context("non-utf8 tag name")?
        .to_string())
}

fn push_child(stack: &mut Vec<XmlNode>, node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn append_text(stack: &mut Vec<XmlNode>, txt: &str) {
    if txt.is_empty() {
        return;
    }
    if let Some(cur) = stack.last_mut() {
        if !cur.text.is_empty() {
            cur.text.push(' ');
        }
        cur.text.push_str(txt);
    }
}

impl XmlNode {
    /// Depth-first search for the first element with this local name,
    /// case-insensitive.
    pub fn find(&self, tag: &str) -> Option<&XmlNode> {
        for c in &self.children {
            if c.name.eq_ignore_ascii_case(tag) {
                return Some(c);
            }
            if let Some(hit) = c.find(tag) {
                return Some(hit);
            }
        }
        None
    }

    /// All elements with this local name, in document order.
    pub fn find_all<'a>(&'a self, tag: &str) -> Vec<&'a XmlNode> {
        let mut out = Vec::new();
        self.collect_into(tag, &mut out);
        out
    }

    fn collect_into<'a>(&'a self, tag: &str, out: &mut Vec<&'a XmlNode>) {
        for c in &self.children {
            if c.name.eq_ignore_ascii_case(tag) {
                out.push(c);
            } else {
                c.collect_into(tag, out);
            }
        }
    }

    /// Direct text of the first matching element, or empty.
    pub fn text_of(&self, tag: &str) -> String {
        self.find(tag).map(|n| n.text.clone()).unwrap_or_default()
    }

    /// Text of the first matching element, unwrapping a nested `<value>`
    /// child when the element itself is empty. Ownership schemas use both
    /// shapes interchangeably.
    pub fn value_of(&self, tag: &str) -> String {
        match self.find(tag) {
            Some(n) if !n.text.is_empty() => n.text.clone(),
            Some(n) => n.text_of("value"),
            None => String::new(),
        }
    }
}
