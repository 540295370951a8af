//! XML Entity Decoding
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//! - General entities declared in the internal DTD subset, expanded
//!   recursively as character data
//!
//! Uses Cow for zero-copy when no entities are present. Any other name is a
//! well-formedness error.

use memchr::memchr;
use std::borrow::Cow;
use std::collections::HashMap;
use thiserror::Error;

/// Upper bound on the bytes one piece of text may expand to
pub const EXPANSION_LIMIT: usize = 1 << 20;

/// Nesting depth at which entity expansion gives up
const MAX_DEPTH: usize = 32;

/// A reference that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EntityError {
    /// Byte offset of the offending `&` within the decoded slice
    pub offset: usize,
    pub message: String,
}

impl EntityError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        EntityError {
            offset,
            message: message.into(),
        }
    }
}

/// Internal general entities: name -> replacement text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entities {
    general: HashMap<String, String>,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an entity. The first declaration of a name binds; later ones
    /// are ignored and reported as `false`.
    pub fn declare(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.general.contains_key(&name) {
            return false;
        }
        self.general.insert(name, value.into());
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.general.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.general.len()
    }

    pub fn is_empty(&self) -> bool {
        self.general.is_empty()
    }
}

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded.
#[inline]
pub fn decode_text<'a>(input: &'a [u8], entities: &Entities) -> Result<Cow<'a, [u8]>, EntityError> {
    // Fast path: check if there are any entities using SIMD
    if memchr(b'&', input).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    let mut result = Vec::with_capacity(input.len());
    let mut open = Vec::new();
    decode_into(input, entities, &mut open, &mut result)?;
    Ok(Cow::Owned(result))
}

/// Decode all entity references in `input` onto `out`. `open` holds the
/// names being expanded, outermost first.
fn decode_into(
    input: &[u8],
    entities: &Entities,
    open: &mut Vec<String>,
    out: &mut Vec<u8>,
) -> Result<(), EntityError> {
    let mut pos = 0;

    while let Some(amp_offset) = memchr(b'&', &input[pos..]) {
        out.extend_from_slice(&input[pos..pos + amp_offset]);
        pos += amp_offset;

        let semi_offset = memchr(b';', &input[pos..])
            .ok_or_else(|| EntityError::new(pos, "unterminated entity reference"))?;
        let entity = &input[pos + 1..pos + semi_offset];

        match decode_entity(entity) {
            Ok(Some(decoded)) => {
                let mut utf8 = [0u8; 4];
                out.extend_from_slice(decoded.encode_utf8(&mut utf8).as_bytes());
            }
            Ok(None) => {
                expand(entity, entities, open, out).map_err(|e| EntityError::new(pos, e.message))?
            }
            Err(message) => return Err(EntityError::new(pos, message)),
        }
        if out.len() > EXPANSION_LIMIT {
            return Err(EntityError::new(
                pos,
                format!("entity expansion exceeds {} bytes", EXPANSION_LIMIT),
            ));
        }
        pos += semi_offset + 1;
    }

    out.extend_from_slice(&input[pos..]);
    Ok(())
}

/// Expand a declared general entity in place
fn expand(
    name: &[u8],
    entities: &Entities,
    open: &mut Vec<String>,
    out: &mut Vec<u8>,
) -> Result<(), EntityError> {
    let name = String::from_utf8_lossy(name);
    let Some(value) = entities.get(&name) else {
        return Err(EntityError::new(0, format!("undefined entity &{};", name)));
    };
    if open.iter().any(|n| *n == name) {
        return Err(EntityError::new(0, format!("entity &{}; references itself", name)));
    }
    if open.len() >= MAX_DEPTH {
        return Err(EntityError::new(0, format!("entity &{}; is nested too deeply", name)));
    }

    open.push(name.into_owned());
    let result = decode_into(value.as_bytes(), entities, open, out);
    open.pop();
    result
}

/// Decode a predefined entity or character reference (without & and ;).
/// `None` means the name has to be looked up in the declared entities.
fn decode_entity(entity: &[u8]) -> Result<Option<char>, String> {
    if let Some(reference) = entity.strip_prefix(b"#") {
        return decode_numeric_entity(reference).map(Some).ok_or_else(|| {
            format!(
                "invalid character reference &#{};",
                String::from_utf8_lossy(reference)
            )
        });
    }

    match entity {
        b"lt" => Ok(Some('<')),
        b"gt" => Ok(Some('>')),
        b"amp" => Ok(Some('&')),
        b"quot" => Ok(Some('"')),
        b"apos" => Ok(Some('\'')),
        b"" => Err("empty entity reference".to_string()),
        _ => Ok(None),
    }
}

/// Decode a numeric character reference, validating against the XML 1.0
/// Char production
fn decode_numeric_entity(entity: &[u8]) -> Option<char> {
    let codepoint = match entity.first()? {
        b'x' => {
            let hex = std::str::from_utf8(&entity[1..]).ok()?;
            if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            u32::from_str_radix(hex, 16).ok()?
        }
        _ => {
            let dec = std::str::from_utf8(entity).ok()?;
            if !dec.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            dec.parse::<u32>().ok()?
        }
    };

    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_no_entities() {
        let result = decode_text(b"Hello, World!", &Entities::new()).unwrap();
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.as_ref(), b"Hello, World!");
    }

    #[test]
    fn test_basic_entities() {
        let result = decode_text(b"&lt;hello&gt; &amp; &quot;world&quot; &apos;", &Entities::new()).unwrap();
        assert_eq!(result.as_ref(), b"<hello> & \"world\" '");
    }

    #[rstest]
    #[case(b"&#65;&#66;&#67;", "ABC")]
    #[case(b"&#x41;&#x42;&#x43;", "ABC")]
    #[case(b"&#x1F600;", "\u{1F600}")]
    #[case(b"a&#10;b", "a\nb")]
    fn test_numeric_references(#[case] input: &[u8], #[case] expected: &str) {
        let result = decode_text(input, &Entities::new()).unwrap();
        assert_eq!(std::str::from_utf8(result.as_ref()).unwrap(), expected);
    }

    #[test]
    fn test_undefined_entity() {
        let err = decode_text(b"ok &nbsp; no", &Entities::new()).unwrap_err();
        assert_eq!(err.offset, 3);
        assert_eq!(err.message, "undefined entity &nbsp;");
    }

    #[rstest]
    #[case(b"&#0;")]
    #[case(b"&#xD800;")]
    #[case(b"&#xZZ;")]
    #[case(b"&#;")]
    #[case(b"&#X41;")]
    fn test_invalid_character_reference(#[case] input: &[u8]) {
        let err = decode_text(input, &Entities::new()).unwrap_err();
        assert!(err.message.starts_with("invalid character reference"), "{}", err);
    }

    #[test]
    fn test_unterminated_reference() {
        let err = decode_text(b"fish & chips", &Entities::new()).unwrap_err();
        assert_eq!(err.offset, 5);
        assert_eq!(err.message, "unterminated entity reference");
    }

    fn declared(pairs: &[(&str, &str)]) -> Entities {
        let mut entities = Entities::new();
        for (name, value) in pairs {
            entities.declare(*name, *value);
        }
        entities
    }

    #[test]
    fn test_declared_entities_expand() {
        let entities = declared(&[("co", "Acme"), ("full", "&co; &amp; Sons")]);
        let result = decode_text(b"by &full;.", &entities).unwrap();
        assert_eq!(result.as_ref(), b"by Acme & Sons.");
    }

    #[test]
    fn test_first_declaration_binds() {
        let mut entities = Entities::new();
        assert!(entities.declare("x", "1"));
        assert!(!entities.declare("x", "2"));
        assert_eq!(entities.get("x"), Some("1"));
        assert_eq!(entities.len(), 1);
    }

    #[test]
    fn test_recursive_entity() {
        let entities = declared(&[("a", "[&b;]"), ("b", "&a;")]);
        let err = decode_text(b"x &a;", &entities).unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.message, "entity &a; references itself");
    }

    #[test]
    fn test_undefined_inside_declared_entity() {
        let entities = declared(&[("a", "&missing;")]);
        let err = decode_text(b"&a;", &entities).unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.message, "undefined entity &missing;");
    }

    #[test]
    fn test_expansion_limit() {
        let mut entities = declared(&[("l0", "xxxxxxxxxxxxxxxx")]);
        for level in 1..8 {
            let refs = format!("&l{};", level - 1).repeat(16);
            entities.declare(format!("l{}", level), refs);
        }
        let err = decode_text(b"&l7;", &entities).unwrap_err();
        assert!(err.message.starts_with("entity expansion exceeds"), "{}", err);
    }
}
