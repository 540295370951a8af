//! SIMD-accelerated XML scanning using memchr
//!
//! The scanner walks a window of the read buffer. It never owns input:
//! the lexer builds a fresh scanner over whatever is buffered, and a
//! construct the window cuts short is simply scanned again after a refill.

use memchr::{memchr, memchr_iter, memmem};

/// Scanner for XML delimiter detection
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given input
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    /// Create a scanner positioned at `pos`
    #[inline]
    pub fn at(input: &'a [u8], pos: usize) -> Self {
        Scanner { input, pos }
    }

    /// Get the current position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Check if we've reached the end of the window
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Bytes left in the window
    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos.min(self.input.len())..]
    }

    /// Peek at current byte without advancing
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Advance by n bytes
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    /// Skip whitespace characters (space, tab, newline, carriage return)
    #[inline]
    pub fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && is_whitespace(self.input[self.pos]) {
            self.pos += 1;
        }
    }

    /// Find next occurrence of a specific byte
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, self.remaining()).map(|i| self.pos + i)
    }

    /// Find the next occurrence of a multi-byte terminator such as `-->`
    #[inline]
    pub fn find_sequence(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(self.remaining(), needle).map(|i| self.pos + i)
    }

    /// Find tag end while handling quotes properly
    /// Returns the position of '>' that is not inside quotes
    pub fn find_tag_end_quoted(&self) -> Option<usize> {
        let mut in_single_quote = false;
        let mut in_double_quote = false;

        for (i, &b) in self.remaining().iter().enumerate() {
            match b {
                b'"' if !in_single_quote => in_double_quote = !in_double_quote,
                b'\'' if !in_double_quote => in_single_quote = !in_single_quote,
                b'>' if !in_single_quote && !in_double_quote => return Some(self.pos + i),
                _ => {}
            }
        }
        None
    }

    /// Check if input starts with a byte sequence at current position
    #[inline]
    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.remaining().starts_with(needle)
    }

    /// Read an XML name (starts with letter/underscore/colon, continues with
    /// letters/digits/hyphens/underscores/periods/colons)
    pub fn read_name(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        let first = *self.input.get(start)?;
        if !is_name_start_char(first) {
            return None;
        }

        self.pos += 1;
        while self.pos < self.input.len() && is_name_char(self.input[self.pos]) {
            self.pos += 1;
        }

        Some(&self.input[start..self.pos])
    }
}

/// Count newlines in a byte slice and report the byte length of the tail
/// after the last one (`None` when there is no newline).
#[inline]
pub fn line_breaks(bytes: &[u8]) -> (u64, Option<usize>) {
    let mut count = 0u64;
    let mut last = None;
    for i in memchr_iter(b'\n', bytes) {
        count += 1;
        last = Some(i);
    }
    (count, last.map(|i| bytes.len() - i - 1))
}

#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Check if byte is valid XML name start character
/// Allows ASCII letters, underscore, colon, and non-ASCII (UTF-8 Unicode)
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

/// Check if byte is valid XML name character
/// Allows ASCII alphanumeric, punctuation, and non-ASCII (UTF-8 Unicode)
#[inline]
pub fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_sequence() {
        let scanner = Scanner::at(b"<!-- a > b -->x", 4);
        assert_eq!(scanner.find_sequence(b"-->"), Some(11));
    }

    #[test]
    fn test_find_tag_end_quoted() {
        let scanner = Scanner::new(b"<a attr=\">test\">content");
        assert_eq!(scanner.find_tag_end_quoted(), Some(15));
    }

    #[test]
    fn test_find_tag_end_unterminated() {
        let scanner = Scanner::new(b"<a attr=\">");
        assert_eq!(scanner.find_tag_end_quoted(), None);
    }

    #[test]
    fn test_read_name() {
        let mut scanner = Scanner::new(b"element-name>");
        assert_eq!(scanner.read_name(), Some(b"element-name" as &[u8]));
        assert_eq!(scanner.position(), 12);
    }

    #[test]
    fn test_read_name_rejects_digit_start() {
        let mut scanner = Scanner::new(b"1abc");
        assert_eq!(scanner.read_name(), None);
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn test_skip_whitespace() {
        let mut scanner = Scanner::new(b"  \t\n hello");
        scanner.skip_whitespace();
        assert_eq!(scanner.position(), 5);
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(line_breaks(b"abc"), (0, None));
        assert_eq!(line_breaks(b"a\nbc\nde"), (2, Some(2)));
        assert_eq!(line_breaks(b"ab\n"), (1, Some(0)));
    }
}
