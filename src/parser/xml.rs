//! Reads a SIRI XML document into a generic tree.
//!
//! The tree uses the same shape a JSON producer would emit, so both formats
//! share one binding step:
//!
//! - elements become objects keyed by local name, attributes become
//!   string properties keyed by local name (`xml:lang` → `lang`);
//! - repeated sibling elements become an array (lists are unwrapped, there
//!   is no enclosing wrapper element);
//! - an element holding only text becomes a string;
//! - text next to attributes or child elements is stored under the
//!   configured text element name.
//!
//! Text is kept as written. Only whitespace-only text (indentation between
//! elements) is dropped.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

use crate::error::DecodeError;

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, DecodeError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut fields = Map::new();

        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            fields.insert(key, Value::String(value));
        }

        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(self, text_element: &str) -> (String, Value) {
        let blank = self.text.trim().is_empty();
        if self.fields.is_empty() {
            let text = if blank { String::new() } else { self.text };
            return (self.name, Value::String(text));
        }

        let mut fields = self.fields;
        if !blank {
            fields.insert(text_element.to_string(), Value::String(self.text));
        }
        (self.name, Value::Object(fields))
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            None => {
                self.fields.insert(name, value);
            }
            // Element values are never arrays, so an array here can only
            // come from an earlier repetition.
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
}

/// Parses `bytes` and returns the root element's local name and content.
pub fn read_tree(bytes: &[u8], text_element: &str) -> Result<(String, Value), DecodeError> {
    let mut reader = Reader::from_reader(bytes);

    let mut stack: Vec<Frame> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => stack.push(Frame::open(&e)?),
            Event::Empty(e) => {
                let (name, value) = Frame::open(&e)?.close(text_element);
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, value),
                    None => return Ok((name, value)),
                }
            }
            Event::Text(t) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(c.as_ref()));
                }
            }
            Event::End(_) => {
                let frame = stack.pop().ok_or_else(|| {
                    DecodeError::Structure("closing tag without matching start".to_string())
                })?;
                let (name, value) = frame.close(text_element);
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, value),
                    None => return Ok((name, value)),
                }
            }
            Event::Eof => {
                return Err(DecodeError::Structure(if stack.is_empty() {
                    "document has no root element".to_string()
                } else {
                    "unexpected end of document".to_string()
                }));
            }
            _ => {}
        }
        buf.clear();
    }
}
