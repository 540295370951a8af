//! XML Attribute Parsing
//!
//! Parses the attribute list of a start tag: the bytes between the element
//! name and the closing `>` or `/>`.

use super::entities::{decode_text, Entities};
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use memchr::memchr;

/// A parsed, decoded attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name (may include namespace prefix)
    pub name: String,
    /// Attribute value (entities decoded, whitespace normalized)
    pub value: String,
}

/// Why an attribute list was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeError {
    /// Byte offset within the attribute list
    pub offset: usize,
    pub message: String,
    /// True when the failure is a bad reference inside a value
    pub entity: bool,
}

impl AttributeError {
    fn syntax(offset: usize, message: impl Into<String>) -> Self {
        AttributeError {
            offset,
            message: message.into(),
            entity: false,
        }
    }
}

/// Result of parsing one attribute list
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedAttributes {
    /// Attributes in document order, first occurrence of each name
    pub attributes: Vec<Attribute>,
    /// Names that appeared more than once
    pub duplicates: Vec<String>,
}

/// Parse attributes from raw tag content (after the element name),
/// expanding references against `entities`
pub fn parse_attributes(input: &[u8], entities: &Entities) -> Result<ParsedAttributes, AttributeError> {
    let mut parsed = ParsedAttributes::default();
    let mut pos = 0;

    loop {
        let before_ws = pos;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() {
            return Ok(parsed);
        }
        if pos == before_ws && pos > 0 {
            return Err(AttributeError::syntax(
                pos,
                "attributes must be separated by whitespace",
            ));
        }

        // Parse attribute name
        let name_start = pos;
        if !is_name_start_char(input[pos]) {
            return Err(AttributeError::syntax(pos, "invalid attribute name"));
        }
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = utf8(&input[name_start..pos], name_start)?;

        // Skip whitespace around '='
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if input.get(pos) != Some(&b'=') {
            return Err(AttributeError::syntax(
                pos,
                format!("attribute '{}' has no value", name),
            ));
        }
        pos += 1;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        // Quoted value
        let quote = match input.get(pos) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            _ => {
                return Err(AttributeError::syntax(
                    pos,
                    format!("value of attribute '{}' is not quoted", name),
                ))
            }
        };
        pos += 1;
        let value_start = pos;
        let value_len = memchr(quote, &input[value_start..]).ok_or_else(|| {
            AttributeError::syntax(value_start, format!("unterminated value of attribute '{}'", name))
        })?;
        let raw = &input[value_start..value_start + value_len];
        pos = value_start + value_len + 1;

        if let Some(lt) = memchr(b'<', raw) {
            return Err(AttributeError::syntax(
                value_start + lt,
                "'<' is not allowed in attribute values",
            ));
        }

        // Literal whitespace is normalized before references are expanded,
        // so `&#10;` survives as a newline
        let normalized = normalize(raw);
        let decoded = decode_text(&normalized, entities).map_err(|e| AttributeError {
            offset: value_start + e.offset,
            message: e.message,
            entity: true,
        })?;
        let value = utf8(decoded.as_ref(), value_start)?;

        if parsed.attributes.iter().any(|a| a.name == name) {
            parsed.duplicates.push(name);
        } else {
            parsed.attributes.push(Attribute { name, value });
        }
    }
}

/// Attribute-value normalization: every literal tab, newline and carriage
/// return becomes a space
fn normalize(raw: &[u8]) -> Vec<u8> {
    raw.iter()
        .map(|&b| if matches!(b, b'\t' | b'\n' | b'\r') { b' ' } else { b })
        .collect()
}

fn utf8(bytes: &[u8], offset: usize) -> Result<String, AttributeError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| AttributeError::syntax(offset, "attribute is not valid UTF-8"))
}
