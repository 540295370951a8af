//! Streaming Lexer with ContentHandler / ErrorHandler Traits
//!
//! Pulls bytes from a [`BufferedReader`] and pushes well-formedness checked
//! events to a handler, in document order:
//! - `start_element` (empty-element tags deliver start and end)
//! - `characters`: all character data between two tags as one run;
//!   comments and processing instructions do not split a run
//! - `end_element`
//!
//! Problems go to the [`ErrorHandler`] half of the handler. Any callback
//! can stop the run by returning `ControlFlow::Break`.

use super::attributes::{parse_attributes, Attribute};
use super::dtd::parse_internal_subset;
use super::encoding::XmlEncoding;
use super::entities::{decode_text, Entities};
use super::scanner::{is_name_start_char, is_whitespace, Scanner};
use crate::error::{Category, Diagnostic, Position, Severity};
use crate::reader::buffered::BufferedReader;
use memchr::memchr;
use std::io::{self, Read};
use std::mem;
use std::ops::ControlFlow;

/// What a callback wants the lexer to do next
pub type Flow = ControlFlow<()>;

/// Receives document content
pub trait ContentHandler {
    fn start_document(&mut self) -> Flow {
        Flow::Continue(())
    }

    /// Called when an element starts
    ///
    /// # Arguments
    /// * `name` - Raw qualified name
    /// * `attributes` - Decoded attributes in document order
    fn start_element(&mut self, name: &str, attributes: Vec<Attribute>) -> Flow;

    /// Called with one run of character data (entity-decoded, untrimmed)
    fn characters(&mut self, text: &str) -> Flow;

    fn end_element(&mut self, name: &str) -> Flow;

    /// Called once the root element closed and nothing but misc followed
    fn end_document(&mut self) -> Flow {
        Flow::Continue(())
    }
}

/// Receives diagnostics
///
/// Returning `Break` from `warning` or `error` ends the run as failed.
/// A fatal error always ends it.
pub trait ErrorHandler {
    fn warning(&mut self, _diagnostic: &Diagnostic) -> Flow {
        Flow::Continue(())
    }

    fn error(&mut self, _diagnostic: &Diagnostic) -> Flow {
        Flow::Continue(())
    }

    fn fatal_error(&mut self, diagnostic: &Diagnostic);
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The whole document was read
    Completed,
    /// A content callback asked to stop
    Aborted,
    /// A diagnostic ended the run
    Failed,
}

/// Internal early-exit reason, so `?` can unwind the token loop
#[derive(Debug)]
enum Halt {
    Aborted,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Before the root element
    Prolog,
    /// Inside the root element
    Body,
    /// After the root element closed
    Epilog,
}

#[derive(Debug)]
enum Token {
    Text(String),
    Cdata(String),
    Comment,
    Pi,
    Declaration {
        version: Option<String>,
        encoding: Option<String>,
    },
    /// Entities declared in the internal subset
    Doctype(Entities),
    StartTag {
        name: String,
        attributes: Vec<Attribute>,
        duplicates: Vec<String>,
        empty: bool,
    },
    EndTag(String),
}

/// Result of trying to read one token from the front of the buffer
#[derive(Debug)]
enum Scan {
    /// A token and the number of bytes it spans
    Token(Token, usize),
    /// Nothing buffered
    Empty,
    /// The token continues past the buffered bytes
    Incomplete(&'static str),
    /// Not well-formed at the given buffer offset
    Malformed(usize, Category, String),
}

/// Push lexer over a byte source
pub struct Lexer<R: Read> {
    source: BufferedReader<R>,
    open: Vec<String>,
    phase: Phase,
    /// Character data since the last tag
    pending: String,
    doctype_seen: bool,
    entities: Entities,
}

impl<R: Read> Lexer<R> {
    pub fn new(reader: R) -> Self {
        Self::with_source(BufferedReader::new(reader))
    }

    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self::with_source(BufferedReader::with_capacity(reader, capacity))
    }

    fn with_source(source: BufferedReader<R>) -> Self {
        Lexer {
            source,
            open: Vec::new(),
            phase: Phase::Prolog,
            pending: String::new(),
            doctype_seen: false,
            entities: Entities::new(),
        }
    }

    /// Position of the next unread byte
    pub fn position(&self) -> Position {
        self.source.position()
    }

    /// Lex the document, calling handler methods for each event
    pub fn run<H: ContentHandler + ErrorHandler>(&mut self, handler: &mut H) -> Outcome {
        match self.drive(handler) {
            Ok(()) => Outcome::Completed,
            Err(Halt::Aborted) => Outcome::Aborted,
            Err(Halt::Failed) => Outcome::Failed,
        }
    }

    fn drive<H: ContentHandler + ErrorHandler>(&mut self, handler: &mut H) -> Result<(), Halt> {
        content(handler.start_document())?;
        loop {
            let scanned = scan(
                self.source.buffered(),
                self.source.is_exhausted(),
                &self.entities,
            );
            match scanned {
                Scan::Token(token, len) => {
                    let at = self.source.position();
                    self.source.consume(len);
                    self.dispatch(token, at, handler)?;
                }
                Scan::Malformed(offset, category, message) => {
                    let at = self.source.position_at(offset);
                    return Err(fatal(handler, category, message, at));
                }
                Scan::Empty if self.source.is_exhausted() => return self.end(handler),
                Scan::Incomplete(what) if self.source.is_exhausted() => {
                    let at = self.source.position();
                    return Err(fatal(
                        handler,
                        Category::Syntax,
                        format!("unexpected end of input inside {}", what),
                        at,
                    ));
                }
                Scan::Empty | Scan::Incomplete(_) => self.refill(handler)?,
            }
        }
    }

    fn refill<H: ErrorHandler>(&mut self, handler: &mut H) -> Result<(), Halt> {
        match self.source.fill_buffer() {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                let at = self.source.position();
                Err(fatal(handler, Category::Encoding, e.to_string(), at))
            }
            Err(e) => {
                let diagnostic = Diagnostic::new(
                    Severity::Error,
                    Category::Io,
                    format!("read failed: {}", e),
                    self.source.position(),
                );
                // The source is unusable whatever the handler says
                report(handler, diagnostic)?;
                Err(Halt::Failed)
            }
        }
    }

    fn dispatch<H: ContentHandler + ErrorHandler>(
        &mut self,
        token: Token,
        at: Position,
        handler: &mut H,
    ) -> Result<(), Halt> {
        match token {
            Token::Text(text) => {
                if self.phase == Phase::Body {
                    self.pending.push_str(&text);
                } else if !text.bytes().all(is_whitespace) {
                    let message = match self.phase {
                        Phase::Prolog => "text before the root element",
                        _ => "content after the root element",
                    };
                    return Err(fatal(handler, Category::Syntax, message, at));
                }
                Ok(())
            }
            Token::Cdata(text) => {
                if self.phase != Phase::Body {
                    return Err(fatal(
                        handler,
                        Category::Syntax,
                        "CDATA section outside the root element",
                        at,
                    ));
                }
                self.pending.push_str(&text);
                Ok(())
            }
            Token::Comment | Token::Pi => Ok(()),
            Token::Declaration { version, encoding } => {
                self.declaration(version, encoding, at, handler)
            }
            Token::Doctype(entities) => {
                if self.phase != Phase::Prolog || self.doctype_seen {
                    return Err(fatal(handler, Category::Syntax, "misplaced DOCTYPE", at));
                }
                self.doctype_seen = true;
                self.entities = entities;
                Ok(())
            }
            Token::StartTag {
                name,
                attributes,
                duplicates,
                empty,
            } => {
                match self.phase {
                    Phase::Epilog => {
                        return Err(fatal(
                            handler,
                            Category::Syntax,
                            format!("element <{}> after the root element", name),
                            at,
                        ))
                    }
                    Phase::Prolog => self.phase = Phase::Body,
                    Phase::Body => {}
                }
                for duplicate in duplicates {
                    report(
                        handler,
                        Diagnostic::new(
                            Severity::Error,
                            Category::Syntax,
                            format!("duplicate attribute '{}' on <{}>", duplicate, name),
                            at,
                        ),
                    )?;
                }

                self.flush_text(handler)?;
                content(handler.start_element(&name, attributes))?;
                if empty {
                    content(handler.end_element(&name))?;
                    if self.open.is_empty() {
                        self.phase = Phase::Epilog;
                    }
                } else {
                    self.open.push(name);
                }
                Ok(())
            }
            Token::EndTag(name) => {
                match self.open.last() {
                    None => {
                        return Err(fatal(
                            handler,
                            Category::Syntax,
                            format!("unexpected end tag </{}>", name),
                            at,
                        ))
                    }
                    Some(open) if *open != name => {
                        let message =
                            format!("mismatched end tag: expected </{}>, found </{}>", open, name);
                        return Err(fatal(handler, Category::Syntax, message, at));
                    }
                    Some(_) => {}
                }

                self.flush_text(handler)?;
                self.open.pop();
                content(handler.end_element(&name))?;
                if self.open.is_empty() {
                    self.phase = Phase::Epilog;
                }
                Ok(())
            }
        }
    }

    fn declaration<H: ErrorHandler>(
        &mut self,
        version: Option<String>,
        encoding: Option<String>,
        at: Position,
        handler: &mut H,
    ) -> Result<(), Halt> {
        if at.offset != 0 {
            return Err(fatal(
                handler,
                Category::Syntax,
                "XML declaration is only allowed at the start of the document",
                at,
            ));
        }

        let Some(version) = version else {
            return Err(fatal(
                handler,
                Category::Syntax,
                "XML declaration without version",
                at,
            ));
        };
        if version != "1.0" && version != "1.1" {
            report(
                handler,
                Diagnostic::new(
                    Severity::Warning,
                    Category::Declaration,
                    format!("unsupported XML version {}", version),
                    at,
                ),
            )?;
        }

        if let Some(encoding) = encoding {
            let supported = ["utf-8", "utf8", "utf-16", "utf16", "us-ascii", "ascii"]
                .iter()
                .any(|e| encoding.eq_ignore_ascii_case(e));
            if !supported {
                report(
                    handler,
                    Diagnostic::new(
                        Severity::Error,
                        Category::Encoding,
                        format!("unsupported encoding {}", encoding),
                        at,
                    ),
                )?;
            } else if let Some(detected) = self.source.encoding() {
                let declared_utf16 = ["utf-16", "utf16"]
                    .iter()
                    .any(|e| encoding.eq_ignore_ascii_case(e));
                if declared_utf16 != (detected != XmlEncoding::Utf8) {
                    report(
                        handler,
                        Diagnostic::new(
                            Severity::Error,
                            Category::Encoding,
                            format!("encoding declared as {} does not match the document", encoding),
                            at,
                        ),
                    )?;
                }
            }
        }
        Ok(())
    }

    fn flush_text<H: ContentHandler>(&mut self, handler: &mut H) -> Result<(), Halt> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let text = mem::take(&mut self.pending);
        content(handler.characters(&text))
    }

    fn end<H: ContentHandler + ErrorHandler>(&mut self, handler: &mut H) -> Result<(), Halt> {
        let at = self.source.position();
        match self.phase {
            Phase::Prolog => Err(fatal(handler, Category::Syntax, "no root element", at)),
            Phase::Body => {
                let name = self.open.last().map(String::as_str).unwrap_or_default();
                let message = format!("unexpected end of input: <{}> is not closed", name);
                Err(fatal(handler, Category::Syntax, message, at))
            }
            Phase::Epilog => content(handler.end_document()),
        }
    }
}

fn content(flow: Flow) -> Result<(), Halt> {
    match flow {
        Flow::Continue(()) => Ok(()),
        Flow::Break(()) => Err(Halt::Aborted),
    }
}

fn fatal<H: ErrorHandler>(
    handler: &mut H,
    category: Category,
    message: impl Into<String>,
    at: Position,
) -> Halt {
    handler.fatal_error(&Diagnostic::fatal(category, message, at));
    Halt::Failed
}

/// Deliver a non-fatal diagnostic
fn report<H: ErrorHandler>(handler: &mut H, diagnostic: Diagnostic) -> Result<(), Halt> {
    let flow = match diagnostic.severity {
        Severity::Warning => handler.warning(&diagnostic),
        Severity::Error => handler.error(&diagnostic),
        Severity::Fatal => {
            handler.fatal_error(&diagnostic);
            return Err(Halt::Failed);
        }
    };
    match flow {
        Flow::Continue(()) => Ok(()),
        Flow::Break(()) => Err(Halt::Failed),
    }
}

// ============================================================================
// Token scanning
// ============================================================================

/// Read one token from the front of `buf`
fn scan(buf: &[u8], exhausted: bool, entities: &Entities) -> Scan {
    if buf.is_empty() {
        return Scan::Empty;
    }
    if buf[0] != b'<' {
        return scan_text(buf, exhausted, entities);
    }
    match buf.get(1) {
        None => Scan::Incomplete("markup"),
        Some(b'/') => scan_end_tag(buf),
        Some(b'?') => scan_pi(buf),
        Some(b'!') => scan_bang(buf),
        Some(&c) if is_name_start_char(c) => scan_start_tag(buf, entities),
        Some(_) => Scan::Malformed(1, Category::Syntax, "invalid element name".to_string()),
    }
}

/// Whether `buf` starts with `literal`; `None` while it is still a prefix
fn starts(buf: &[u8], literal: &[u8]) -> Option<bool> {
    let n = buf.len().min(literal.len());
    if buf[..n] != literal[..n] {
        Some(false)
    } else if n < literal.len() {
        None
    } else {
        Some(true)
    }
}

fn utf8(bytes: &[u8], offset: usize) -> Result<String, Scan> {
    String::from_utf8(bytes.to_vec()).map_err(|e| {
        Scan::Malformed(
            offset + e.utf8_error().valid_up_to(),
            Category::Encoding,
            "invalid UTF-8".to_string(),
        )
    })
}

fn scan_text(buf: &[u8], exhausted: bool, entities: &Entities) -> Scan {
    let end = match memchr(b'<', buf) {
        Some(i) => i,
        None if exhausted => buf.len(),
        None => return Scan::Incomplete("text"),
    };
    let decoded = match decode_text(&buf[..end], entities) {
        Ok(decoded) => decoded,
        Err(e) => return Scan::Malformed(e.offset, Category::Entity, e.message),
    };
    match utf8(&decoded, 0) {
        Ok(text) => Scan::Token(Token::Text(text), end),
        Err(malformed) => malformed,
    }
}

fn scan_bang(buf: &[u8]) -> Scan {
    match starts(buf, b"<!--") {
        Some(true) => {
            return match Scanner::at(buf, 4).find_sequence(b"-->") {
                Some(end) => Scan::Token(Token::Comment, end + 3),
                None => Scan::Incomplete("comment"),
            }
        }
        None => return Scan::Incomplete("comment"),
        Some(false) => {}
    }

    match starts(buf, b"<![CDATA[") {
        Some(true) => {
            return match Scanner::at(buf, 9).find_sequence(b"]]>") {
                Some(end) => match utf8(&buf[9..end], 9) {
                    Ok(text) => Scan::Token(Token::Cdata(text), end + 3),
                    Err(malformed) => malformed,
                },
                None => Scan::Incomplete("CDATA section"),
            }
        }
        None => return Scan::Incomplete("CDATA section"),
        Some(false) => {}
    }

    match starts(buf, b"<!DOCTYPE") {
        Some(true) => scan_doctype(buf),
        None => Scan::Incomplete("DOCTYPE"),
        Some(false) => Scan::Malformed(0, Category::Syntax, "invalid markup declaration".to_string()),
    }
}

/// DOCTYPE ends at the first `>` outside quotes and the internal subset.
/// Inside the subset comments and PIs are skipped whole, so quotes in them
/// do not count.
fn scan_doctype(buf: &[u8]) -> Scan {
    let mut quote = None;
    let mut subset_start = None;
    let mut subset = None;
    let mut i = 9;

    while let Some(&b) = buf.get(i) {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        if subset_start.is_some() && subset.is_none() {
            let unit: Option<(usize, &[u8])> = if buf[i..].starts_with(b"<!--") {
                Some((4, &b"-->"[..]))
            } else if buf[i..].starts_with(b"<?") {
                Some((2, &b"?>"[..]))
            } else {
                None
            };
            if let Some((open, close)) = unit {
                match Scanner::at(buf, i + open).find_sequence(close) {
                    Some(end) => {
                        i = end + close.len();
                        continue;
                    }
                    None => return Scan::Incomplete("DOCTYPE"),
                }
            }
        }

        match b {
            b'"' | b'\'' => quote = Some(b),
            b'[' if subset_start.is_none() => subset_start = Some(i + 1),
            b']' if subset.is_none() => subset = subset_start.map(|start| start..i),
            b'>' if subset_start.is_none() || subset.is_some() => {
                let entities = match subset.map(|range| (range.start, &buf[range])) {
                    Some((start, body)) => match parse_internal_subset(body) {
                        Ok(entities) => entities,
                        Err(e) => {
                            return Scan::Malformed(start + e.offset, Category::Syntax, e.message)
                        }
                    },
                    None => Entities::new(),
                };
                return Scan::Token(Token::Doctype(entities), i + 1);
            }
            _ => {}
        }
        i += 1;
    }
    Scan::Incomplete("DOCTYPE")
}

fn scan_pi(buf: &[u8]) -> Scan {
    let scanner = Scanner::at(buf, 2);
    let Some(end) = scanner.find_sequence(b"?>") else {
        return Scan::Incomplete("processing instruction");
    };

    let mut scanner = Scanner::at(&buf[..end], 2);
    let Some(target) = scanner.read_name() else {
        return Scan::Malformed(
            2,
            Category::Syntax,
            "processing instruction without target".to_string(),
        );
    };

    if target == b"xml" {
        let data = scanner.remaining();
        let parsed = match parse_attributes(data, &Entities::new()) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Scan::Malformed(
                    5 + e.offset,
                    Category::Syntax,
                    format!("malformed XML declaration: {}", e.message),
                )
            }
        };
        let field = |name: &str| {
            parsed
                .attributes
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.clone())
        };
        let token = Token::Declaration {
            version: field("version"),
            encoding: field("encoding"),
        };
        return Scan::Token(token, end + 2);
    }

    if target.eq_ignore_ascii_case(b"xml") {
        return Scan::Malformed(
            2,
            Category::Syntax,
            "processing instruction target 'xml' is reserved".to_string(),
        );
    }
    if !scanner.is_eof() && !scanner.peek().is_some_and(is_whitespace) {
        return Scan::Malformed(
            scanner.position(),
            Category::Syntax,
            "malformed processing instruction".to_string(),
        );
    }
    Scan::Token(Token::Pi, end + 2)
}

fn scan_end_tag(buf: &[u8]) -> Scan {
    let mut scanner = Scanner::at(buf, 2);
    let Some(end) = scanner.find_byte(b'>') else {
        return Scan::Incomplete("end tag");
    };
    let Some(name) = scanner.read_name() else {
        return Scan::Malformed(2, Category::Syntax, "invalid end tag name".to_string());
    };
    scanner.skip_whitespace();
    if scanner.position() != end {
        return Scan::Malformed(
            scanner.position(),
            Category::Syntax,
            "malformed end tag".to_string(),
        );
    }
    match utf8(name, 2) {
        Ok(name) => Scan::Token(Token::EndTag(name), end + 1),
        Err(malformed) => malformed,
    }
}

fn scan_start_tag(buf: &[u8], entities: &Entities) -> Scan {
    let mut scanner = Scanner::at(buf, 1);
    let Some(end) = scanner.find_tag_end_quoted() else {
        return Scan::Incomplete("start tag");
    };
    let Some(name) = scanner.read_name() else {
        return Scan::Malformed(1, Category::Syntax, "invalid element name".to_string());
    };
    let name = match utf8(name, 1) {
        Ok(name) => name,
        Err(malformed) => return malformed,
    };

    let name_end = scanner.position();
    let inner = &buf[name_end..end];
    let (raw, empty) = match inner.strip_suffix(b"/") {
        Some(raw) => (raw, true),
        None => (inner, false),
    };
    let parsed = match parse_attributes(raw, entities) {
        Ok(parsed) => parsed,
        Err(e) => {
            let category = if e.entity {
                Category::Entity
            } else {
                Category::Syntax
            };
            return Scan::Malformed(name_end + e.offset, category, e.message);
        }
    };

    Scan::Token(
        Token::StartTag {
            name,
            attributes: parsed.attributes,
            duplicates: parsed.duplicates,
            empty,
        },
        end + 1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    /// Records events as readable strings
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        diagnostics: Vec<Diagnostic>,
        stop_at: Option<&'static str>,
        stop_on_error: bool,
    }

    impl ContentHandler for Recorder {
        fn start_element(&mut self, name: &str, attributes: Vec<Attribute>) -> Flow {
            let attrs: Vec<String> = attributes
                .iter()
                .map(|a| format!(" {}={}", a.name, a.value))
                .collect();
            self.events.push(format!("<{}{}>", name, attrs.concat()));
            if self.stop_at == Some(name) {
                return Flow::Break(());
            }
            Flow::Continue(())
        }

        fn characters(&mut self, text: &str) -> Flow {
            self.events.push(format!("{:?}", text));
            Flow::Continue(())
        }

        fn end_element(&mut self, name: &str) -> Flow {
            self.events.push(format!("</{}>", name));
            Flow::Continue(())
        }

        fn end_document(&mut self) -> Flow {
            self.events.push("end".to_string());
            Flow::Continue(())
        }
    }

    impl ErrorHandler for Recorder {
        fn warning(&mut self, diagnostic: &Diagnostic) -> Flow {
            self.diagnostics.push(diagnostic.clone());
            Flow::Continue(())
        }

        fn error(&mut self, diagnostic: &Diagnostic) -> Flow {
            self.diagnostics.push(diagnostic.clone());
            if self.stop_on_error {
                Flow::Break(())
            } else {
                Flow::Continue(())
            }
        }

        fn fatal_error(&mut self, diagnostic: &Diagnostic) {
            self.diagnostics.push(diagnostic.clone());
        }
    }

    /// Hands out one byte per read call
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(1);
            self.0.read(&mut buf[..n])
        }
    }

    fn lex(input: &[u8]) -> (Outcome, Recorder) {
        let mut recorder = Recorder::default();
        let outcome = Lexer::new(Cursor::new(input.to_vec())).run(&mut recorder);
        (outcome, recorder)
    }

    #[test]
    fn test_events_in_document_order() {
        let (outcome, rec) = lex(b"<?xml version=\"1.0\"?>\n<r a=\"1\"><i>x</i><e/></r>\n");
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(
            rec.events,
            vec!["<r a=1>", "<i>", "\"x\"", "</i>", "<e>", "</e>", "</r>", "end"]
        );
        assert!(rec.diagnostics.is_empty());
    }

    #[test]
    fn test_comments_and_cdata_do_not_split_runs() {
        let (outcome, rec) = lex(b"<r>a<!-- c -->b<![CDATA[<c>]]>&amp;<?pi x?>d</r>");
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(rec.events, vec!["<r>", "\"ab<c>&d\"", "</r>", "end"]);
    }

    #[test]
    fn test_byte_at_a_time_matches_whole_input() {
        let input = b"<!DOCTYPE r [<!ELEMENT r ANY>]>\n<r>\n  <i k='v &gt; w'>one &#x41;</i>\n  <i/>\n</r>";
        let (_, whole) = lex(input);

        let mut trickled = Recorder::default();
        let outcome = Lexer::with_capacity(Trickle(Cursor::new(input.to_vec())), 1)
            .run(&mut trickled);
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(trickled.events, whole.events);
        assert!(whole.events.contains(&"<i k=v > w>".to_string()));
    }

    #[test]
    fn test_mismatched_tag_position() {
        let (outcome, rec) = lex(b"<r>\n  <a></b>\n</r>");
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(rec.diagnostics.len(), 1);
        let d = &rec.diagnostics[0];
        assert_eq!(d.severity, Severity::Fatal);
        assert_eq!(d.category, Category::Syntax);
        assert_eq!(d.message, "mismatched end tag: expected </a>, found </b>");
        assert_eq!((d.position.line, d.position.column, d.position.offset), (2, 6, 9));
    }

    #[test]
    fn test_unclosed_element() {
        let (outcome, rec) = lex(b"<r><i>1</i>");
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(rec.diagnostics.len(), 1);
        assert_eq!(
            rec.diagnostics[0].message,
            "unexpected end of input: <r> is not closed"
        );
    }

    #[test]
    fn test_truncated_tag() {
        let (outcome, rec) = lex(b"<r><i a=\"1");
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(
            rec.diagnostics[0].message,
            "unexpected end of input inside start tag"
        );
    }

    #[test]
    fn test_no_root() {
        let (outcome, rec) = lex(b"  <!-- nothing -->  ");
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(rec.diagnostics[0].message, "no root element");
    }

    #[test]
    fn test_content_after_root() {
        let (outcome, rec) = lex(b"<r/><s/>");
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(rec.diagnostics[0].message, "element <s> after the root element");

        let (outcome, rec) = lex(b"<r/>junk");
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(rec.diagnostics[0].message, "content after the root element");
    }

    #[test]
    fn test_undefined_entity_is_fatal() {
        let (outcome, rec) = lex(b"<r>&nbsp;</r>");
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(rec.diagnostics[0].category, Category::Entity);
        assert!(rec.diagnostics[0].is_fatal());
    }

    #[test]
    fn test_duplicate_attribute_is_recoverable() {
        let (outcome, rec) = lex(b"<r a=\"1\" a=\"2\"/>");
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(rec.events, vec!["<r a=1>", "</r>", "end"]);
        assert_eq!(rec.diagnostics[0].severity, Severity::Error);
        assert_eq!(rec.diagnostics[0].category, Category::Syntax);
    }

    #[test]
    fn test_error_handler_can_stop() {
        let mut rec = Recorder {
            stop_on_error: true,
            ..Recorder::default()
        };
        let outcome = Lexer::new(Cursor::new(b"<r a='1' a='2'><i/></r>".to_vec())).run(&mut rec);
        assert_eq!(outcome, Outcome::Failed);
        assert!(rec.events.is_empty());
    }

    #[test]
    fn test_declaration_checks() {
        let (outcome, rec) = lex(b"<?xml version=\"2.0\" encoding=\"EBCDIC\"?><r/>");
        assert_eq!(outcome, Outcome::Completed);
        let kinds: Vec<_> = rec
            .diagnostics
            .iter()
            .map(|d| (d.severity, d.category))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (Severity::Warning, Category::Declaration),
                (Severity::Error, Category::Encoding)
            ]
        );

        let (outcome, rec) = lex(b"<r/><?xml version=\"1.0\"?>");
        assert_eq!(outcome, Outcome::Failed);
        assert!(rec.diagnostics[0].message.contains("XML declaration"));
    }

    #[test]
    fn test_abort_stops_reading() {
        let mut rec = Recorder {
            stop_at: Some("stop"),
            ..Recorder::default()
        };
        let outcome =
            Lexer::new(Cursor::new(b"<r><stop/><after/></r".to_vec())).run(&mut rec);
        assert_eq!(outcome, Outcome::Aborted);
        assert_eq!(rec.events, vec!["<r>", "<stop>"]);
        assert!(rec.diagnostics.is_empty());
    }

    #[test]
    fn test_utf16_input() {
        let mut input = vec![0xFE, 0xFF];
        input.extend("<r>\u{e9}t\u{e9}</r>".encode_utf16().flat_map(|u| u.to_be_bytes()));
        let (outcome, rec) = lex(&input);
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(rec.events, vec!["<r>", "\"\u{e9}t\u{e9}\"", "</r>", "end"]);
    }

    #[test]
    fn test_invalid_utf8() {
        let (outcome, rec) = lex(b"<r>\xFF</r>");
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(rec.diagnostics[0].category, Category::Encoding);
    }

    #[test]
    fn test_invalid_markup() {
        let (outcome, rec) = lex(b"<r><1bad/></r>");
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(rec.diagnostics[0].message, "invalid element name");
        assert_eq!(rec.events, vec!["<r>"]);
    }

    #[test]
    fn test_quotes_in_subset_comments() {
        let input = b"<!DOCTYPE r [<!-- it's fine --><?pi don't?>]>\n<r><i>1</i></r>";
        let (outcome, whole) = lex(input);
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(whole.events, vec!["<r>", "<i>", "\"1\"", "</i>", "</r>", "end"]);

        let mut trickled = Recorder::default();
        let outcome = Lexer::with_capacity(Trickle(Cursor::new(input.to_vec())), 1)
            .run(&mut trickled);
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(trickled.events, whole.events);
    }

    #[test]
    fn test_internal_entities_expand() {
        let (outcome, rec) = lex(
            b"<!DOCTYPE r [\n  <!ENTITY co \"Acme\">\n  <!ENTITY full '&co; Inc'>\n]>\
              <r by=\"&co;\">&full;</r>",
        );
        assert_eq!(outcome, Outcome::Completed);
        assert!(rec.diagnostics.is_empty());
        assert_eq!(rec.events, vec!["<r by=Acme>", "\"Acme Inc\"", "</r>", "end"]);
    }

    #[test]
    fn test_undeclared_entity_with_subset() {
        let (outcome, rec) = lex(b"<!DOCTYPE r [<!ENTITY co \"Acme\">]><r>&other;</r>");
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(rec.diagnostics[0].category, Category::Entity);
        assert_eq!(rec.diagnostics[0].message, "undefined entity &other;");
    }

    #[test]
    fn test_malformed_subset() {
        let (outcome, rec) = lex(b"<!DOCTYPE r [junk]><r/>");
        assert_eq!(outcome, Outcome::Failed);
        let d = &rec.diagnostics[0];
        assert_eq!(d.message, "malformed internal subset");
        assert_eq!((d.position.offset, d.position.column), (13, 14));
    }

    #[test]
    fn test_declared_encoding_mismatch() {
        let (outcome, rec) = lex(b"<?xml version=\"1.0\" encoding=\"UTF-16\"?><r/>");
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(rec.diagnostics.len(), 1);
        assert_eq!(
            (rec.diagnostics[0].severity, rec.diagnostics[0].category),
            (Severity::Error, Category::Encoding)
        );

        let (_, rec) = lex(b"<?xml version=\"1.0\" encoding=\"utf-8\"?><r/>");
        assert!(rec.diagnostics.is_empty());
    }
}
