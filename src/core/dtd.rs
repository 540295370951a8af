//! Internal DTD subset
//!
//! Collects internal general entity declarations (`<!ENTITY name "value">`)
//! from the `[...]` part of a DOCTYPE. Parameter entities, external entities
//! and every other markup declaration are skipped without validation.

use super::entities::Entities;
use super::scanner::{is_whitespace, Scanner};
use memchr::memmem;

/// A malformed declaration inside the internal subset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtdError {
    /// Byte offset within the subset
    pub offset: usize,
    pub message: String,
}

impl DtdError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        DtdError {
            offset,
            message: message.into(),
        }
    }
}

/// Parse the internal subset (the bytes between `[` and `]`)
pub fn parse_internal_subset(subset: &[u8]) -> Result<Entities, DtdError> {
    let mut entities = Entities::new();
    let mut scanner = Scanner::new(subset);

    loop {
        scanner.skip_whitespace();
        if scanner.is_eof() {
            return Ok(entities);
        }
        let at = scanner.position();

        if scanner.starts_with(b"<!--") {
            skip_past(&mut scanner, b"-->", "unterminated comment")?;
        } else if scanner.starts_with(b"<?") {
            skip_past(&mut scanner, b"?>", "unterminated processing instruction")?;
        } else if scanner.starts_with(b"<!ENTITY") {
            scanner.advance(8);
            if let Some((name, value)) = entity_declaration(&mut scanner)? {
                entities.declare(name, value);
            }
        } else if scanner.starts_with(b"<!") {
            skip_declaration(&mut scanner)?;
        } else if scanner.peek() == Some(b'%') {
            // Parameter entity reference
            skip_past(&mut scanner, b";", "unterminated parameter entity reference")?;
        } else {
            return Err(DtdError::new(at, "malformed internal subset"));
        }
    }
}

fn skip_past(scanner: &mut Scanner<'_>, terminator: &[u8], message: &str) -> Result<(), DtdError> {
    let start = scanner.position();
    match memmem::find(scanner.remaining(), terminator) {
        Some(i) => {
            scanner.advance(i + terminator.len());
            Ok(())
        }
        None => Err(DtdError::new(start, message)),
    }
}

/// Skip a markup declaration up to its `>`, ignoring quoted `>`
fn skip_declaration(scanner: &mut Scanner<'_>) -> Result<(), DtdError> {
    let start = scanner.position();
    match scanner.find_tag_end_quoted() {
        Some(end) => {
            scanner.advance(end + 1 - start);
            Ok(())
        }
        None => Err(DtdError::new(start, "unterminated markup declaration")),
    }
}

/// The rest of an ENTITY declaration after `<!ENTITY`. Returns the name and
/// replacement text of an internal general entity, `None` for anything that
/// is not expanded.
fn entity_declaration(scanner: &mut Scanner<'_>) -> Result<Option<(String, String)>, DtdError> {
    let start = scanner.position();
    if !scanner.peek().is_some_and(is_whitespace) {
        return Err(DtdError::new(start, "malformed entity declaration"));
    }
    scanner.skip_whitespace();

    let parameter = scanner.peek() == Some(b'%');
    if parameter {
        scanner.advance(1);
        scanner.skip_whitespace();
    }

    let name_at = scanner.position();
    let name = scanner
        .read_name()
        .ok_or_else(|| DtdError::new(name_at, "invalid entity name"))?;
    let name = text(name, name_at)?;
    scanner.skip_whitespace();

    let value_at = scanner.position();
    let quote = match scanner.peek() {
        Some(q @ (b'"' | b'\'')) => q,
        // SYSTEM / PUBLIC: external entity, never fetched
        _ => {
            skip_declaration(scanner)?;
            return Ok(None);
        }
    };
    scanner.advance(1);
    let Some(close) = scanner.find_byte(quote) else {
        return Err(DtdError::new(value_at, "unterminated entity value"));
    };
    let value = text(&scanner.remaining()[..close - scanner.position()], value_at)?;
    scanner.advance(close + 1 - scanner.position());

    scanner.skip_whitespace();
    if scanner.peek() != Some(b'>') {
        return Err(DtdError::new(scanner.position(), "malformed entity declaration"));
    }
    scanner.advance(1);

    Ok((!parameter).then_some((name, value)))
}

fn text(bytes: &[u8], offset: usize) -> Result<String, DtdError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| DtdError::new(offset, "declaration is not valid UTF-8"))
}
