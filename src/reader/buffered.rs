//! Buffered XML Reader
//!
//! Reads XML from any source implementing Read trait, using an internal
//! buffer that the lexer scans in place. Consumed bytes are compacted away
//! on every refill, so memory stays proportional to the largest single
//! token rather than to the document.

use crate::core::encoding::{Utf16Decoder, XmlEncoding};
use crate::core::scanner::line_breaks;
use crate::error::Position;
use std::io::{self, Read};
use std::mem;

/// Buffer size for reading chunks
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Raw bytes needed before the encoding is decided
const SNIFF_LEN: usize = 4;

/// Buffered XML reader for streaming input
pub struct BufferedReader<R: Read> {
    reader: R,
    /// Decoded (UTF-8) bytes; `buffer[pos..]` is unconsumed
    buffer: Vec<u8>,
    pos: usize,
    /// Raw bytes of the last read
    scratch: Vec<u8>,
    /// Raw head of the document while the encoding is undecided
    sniffed: Vec<u8>,
    capacity: usize,
    eof: bool,
    encoding: Option<XmlEncoding>,
    utf16: Option<Utf16Decoder>,
    /// Position of `buffer[pos]`
    origin: Position,
}

impl<R: Read> BufferedReader<R> {
    /// Create a new buffered reader
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_BUFFER_SIZE)
    }

    /// Create a new buffered reader with specified buffer capacity
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        BufferedReader {
            reader,
            buffer: Vec::with_capacity(capacity),
            pos: 0,
            scratch: Vec::new(),
            sniffed: Vec::new(),
            capacity,
            eof: false,
            encoding: None,
            utf16: None,
            origin: Position::START,
        }
    }

    /// Read more data into the buffer.
    ///
    /// Returns `Ok(false)` once the source is exhausted. A successful read
    /// may still add no decoded bytes (half a UTF-16 code unit, say).
    pub fn fill_buffer(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(false);
        }

        // Compact: move remaining data to start
        if self.pos > 0 {
            self.buffer.drain(..self.pos);
            self.pos = 0;
        }

        // Read at least as much as is already pending so a token larger
        // than the buffer is assembled in a logarithmic number of reads
        let chunk = self.capacity.max(self.buffer.len());
        self.scratch.resize(chunk, 0);
        let read = loop {
            match self.reader.read(&mut self.scratch) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };

        if read == 0 {
            self.eof = true;
            if self.encoding.is_none() && !self.sniffed.is_empty() {
                let head = mem::take(&mut self.sniffed);
                self.start(&head)?;
            }
            return decode_into(self.utf16.as_mut(), &[], true, &mut self.buffer).map(|_| false);
        }

        if self.encoding.is_none() {
            // Hold raw bytes back until a BOM can be recognised
            self.sniffed.extend_from_slice(&self.scratch[..read]);
            if self.sniffed.len() >= SNIFF_LEN {
                let head = mem::take(&mut self.sniffed);
                self.start(&head)?;
            }
            return Ok(true);
        }

        decode_into(self.utf16.as_mut(), &self.scratch[..read], false, &mut self.buffer)?;
        Ok(true)
    }

    /// Get current buffered data as a slice
    pub fn buffered(&self) -> &[u8] {
        &self.buffer[self.pos..]
    }

    /// True once the source has reported end of input
    pub fn is_exhausted(&self) -> bool {
        self.eof
    }

    /// Consume n bytes from the buffer
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.buffer.len() - self.pos);
        self.origin = advance(self.origin, &self.buffer[self.pos..self.pos + n]);
        self.pos += n;
    }

    /// Position of the first unconsumed byte
    pub fn position(&self) -> Position {
        self.origin
    }

    /// Position of the byte at `index` within [`buffered`](Self::buffered)
    pub fn position_at(&self, index: usize) -> Position {
        let pending = self.buffered();
        advance(self.origin, &pending[..index.min(pending.len())])
    }

    /// Encoding detected from the first bytes, once anything was read
    pub fn encoding(&self) -> Option<XmlEncoding> {
        self.encoding
    }

    /// Detect the encoding from the document head, drop the BOM and decode
    fn start(&mut self, head: &[u8]) -> io::Result<()> {
        let encoding = XmlEncoding::detect(head);
        if encoding != XmlEncoding::Utf8 {
            self.utf16 = Some(Utf16Decoder::new(encoding));
        }
        self.encoding = Some(encoding);
        let body = &head[encoding.bom_len(head)..];
        decode_into(self.utf16.as_mut(), body, false, &mut self.buffer)
    }
}

fn decode_into(
    decoder: Option<&mut Utf16Decoder>,
    raw: &[u8],
    last: bool,
    out: &mut Vec<u8>,
) -> io::Result<()> {
    match decoder {
        Some(decoder) => decoder
            .decode(raw, last, out)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
        None => {
            out.extend_from_slice(raw);
            Ok(())
        }
    }
}

fn advance(mut position: Position, bytes: &[u8]) -> Position {
    let (lines, tail) = line_breaks(bytes);
    position.offset += bytes.len() as u64;
    match tail {
        Some(tail) => {
            position.line += lines;
            position.column = tail as u64 + 1;
        }
        None => position.column += bytes.len() as u64,
    }
    position
}
