//! SDMX-ML → `serde_json::Value` tree.
//!
//! The output mirrors the usual XML-to-dictionary conventions so the fallback
//! decoder can walk it like any other JSON document:
//!
//! - attributes become `@name` keys;
//! - text becomes `#text` when the element also has attributes or children,
//!   otherwise the element's value is the bare string;
//! - an empty element without attributes is `null`;
//! - repeated child elements become an array, a single child stays an object;
//! - namespace prefixes are dropped (`message:GenericData` → `GenericData`) and
//!   `xmlns` declarations are not kept.
//!
//! The whole document is wrapped in an object keyed by the root element name.

use crate::error::XmlError;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

/// An element being built while its end tag has not been seen yet.
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = attr.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }
            let value = attr.unescape_value().map_err(XmlError::Text)?;
            attrs.push((
                format!("@{}", local(attr.key.local_name().as_ref())),
                value.into_owned(),
            ));
        }
        Ok(Self {
            name: local(start.local_name().as_ref()),
            attrs,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn into_value(self) -> Value {
        let text = self.text.trim();
        if self.attrs.is_empty() && self.children.is_empty() {
            return if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            };
        }
        let mut map = Map::new();
        for (k, v) in self.attrs {
            map.insert(k, Value::String(v));
        }
        map.extend(self.children);
        if !text.is_empty() {
            map.insert("#text".into(), Value::String(text.to_string()));
        }
        Value::Object(map)
    }
}

fn local(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn close(el: Element, stack: &mut [Element], root: &mut Option<(String, Value)>) {
    let name = el.name.clone();
    let value = el.into_value();
    match stack.last_mut() {
        Some(parent) => parent.add_child(name, value),
        None if root.is_none() => *root = Some((name, value)),
        None => log::warn!("ignoring extra top-level element <{name}>"),
    }
}

/// Parse an XML document into a nested JSON tree.
///
/// ### Errors
/// - [`XmlError::Parse`]: malformed markup (mismatched tags, bad syntax)
/// - [`XmlError::Empty`]: the document contains no element
pub fn to_tree(xml: &str) -> Result<Value, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        let event = reader.read_event().map_err(|source| XmlError::Parse {
            position: reader.buffer_position() as u64,
            source,
        })?;
        match event {
            Event::Start(e) => stack.push(Element::open(&e)?),
            Event::Empty(e) => {
                let el = Element::open(&e)?;
                close(el, &mut stack, &mut root);
            }
            Event::End(e) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| XmlError::UnbalancedTag(local(e.local_name().as_ref())))?;
                close(el, &mut stack, &mut root);
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape().map_err(XmlError::Text)?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    let (name, value) = root.ok_or(XmlError::Empty)?;
    let mut doc = Map::new();
    doc.insert(name, value);
    Ok(Value::Object(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attributes_text_and_repeats() {
        let xml = r#"<?xml version="1.0"?>
            <root a="1">
              <item>x</item>
              <item>y</item>
              <single b="2">z</single>
              <empty/>
            </root>"#;
        let tree = to_tree(xml).unwrap();
        assert_eq!(
            tree,
            json!({"root": {
                "@a": "1",
                "item": ["x", "y"],
                "single": {"@b": "2", "#text": "z"},
                "empty": null
            }})
        );
    }

    #[test]
    fn namespaces_are_stripped() {
        let xml = r#"<message:GenericData xmlns:message="urn:m" xmlns:generic="urn:g">
              <message:DataSet><generic:Series/></message:DataSet>
            </message:GenericData>"#;
        let tree = to_tree(xml).unwrap();
        assert_eq!(tree, json!({"GenericData": {"DataSet": {"Series": null}}}));
    }

    #[test]
    fn entities_are_unescaped() {
        let tree = to_tree(r#"<a t="x &amp; y">1 &lt; 2</a>"#).unwrap();
        assert_eq!(tree, json!({"a": {"@t": "x & y", "#text": "1 < 2"}}));
    }

    #[test]
    fn malformed_and_empty_documents_fail() {
        assert!(to_tree("<a><b></a>").is_err());
        assert!(matches!(to_tree(""), Err(XmlError::Empty)));
        assert!(to_tree("<a>").is_err());
    }
}
