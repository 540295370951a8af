//! XML Encoding Detection and Conversion
//!
//! Detects UTF-16 from the byte order mark or the first bytes and converts
//! it to UTF-8 incrementally, one read at a time, so the lexer only ever
//! sees UTF-8.

/// Detect the encoding of XML input based on BOM or byte patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        if input.len() < 2 {
            return XmlEncoding::Utf8;
        }

        match (input[0], input[1]) {
            // UTF-16 LE BOM: 0xFF 0xFE
            (0xFF, 0xFE) => XmlEncoding::Utf16Le,
            // UTF-16 BE BOM: 0xFE 0xFF
            (0xFE, 0xFF) => XmlEncoding::Utf16Be,
            // No BOM - check for UTF-16 pattern (< followed by null or null followed by <)
            (0x00, b'<') => XmlEncoding::Utf16Be,
            (b'<', 0x00) => XmlEncoding::Utf16Le,
            _ => XmlEncoding::Utf8,
        }
    }

    /// Length of the byte order mark at the start of `input`, if any
    pub fn bom_len(self, input: &[u8]) -> usize {
        let bom: &[u8] = match self {
            XmlEncoding::Utf8 => &[0xEF, 0xBB, 0xBF],
            XmlEncoding::Utf16Le => &[0xFF, 0xFE],
            XmlEncoding::Utf16Be => &[0xFE, 0xFF],
        };
        if input.starts_with(bom) {
            bom.len()
        } else {
            0
        }
    }
}

/// Incremental UTF-16 to UTF-8 converter.
///
/// Bytes that do not yet form a complete code unit (or a high surrogate
/// still waiting for its partner) are carried over to the next call.
#[derive(Debug)]
pub struct Utf16Decoder {
    big_endian: bool,
    carry: Vec<u8>,
}

impl Utf16Decoder {
    pub fn new(encoding: XmlEncoding) -> Self {
        Utf16Decoder {
            big_endian: encoding == XmlEncoding::Utf16Be,
            carry: Vec::new(),
        }
    }

    /// Convert `input` and append the UTF-8 result to `out`.
    ///
    /// With `last` set, any leftover bytes are an error.
    pub fn decode(&mut self, input: &[u8], last: bool, out: &mut Vec<u8>) -> Result<(), String> {
        self.carry.extend_from_slice(input);

        let mut units: Vec<u16> = self
            .carry
            .chunks_exact(2)
            .map(|pair| {
                if self.big_endian {
                    u16::from_be_bytes([pair[0], pair[1]])
                } else {
                    u16::from_le_bytes([pair[0], pair[1]])
                }
            })
            .collect();
        let mut consumed = units.len() * 2;

        // Hold back a trailing high surrogate until its partner arrives
        if !last && matches!(units.last().copied(), Some(0xD800..=0xDBFF)) {
            units.pop();
            consumed -= 2;
        }

        for decoded in char::decode_utf16(units.iter().copied()) {
            let c = decoded.map_err(|e| format!("Invalid UTF-16: {}", e))?;
            let mut utf8 = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
        }
        self.carry.drain(..consumed);

        if last && !self.carry.is_empty() {
            return Err("Invalid UTF-16: odd number of bytes".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16_le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    fn utf16_be(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
    }

    #[test]
    fn test_detect_utf8() {
        assert_eq!(XmlEncoding::detect(b"<root/>"), XmlEncoding::Utf8);
        assert_eq!(XmlEncoding::detect(b"<?xml"), XmlEncoding::Utf8);
        assert_eq!(XmlEncoding::detect(b"<"), XmlEncoding::Utf8);
    }

    #[test]
    fn test_detect_utf8_bom() {
        let input = [0xEF, 0xBB, 0xBF, b'<'];
        assert_eq!(XmlEncoding::detect(&input), XmlEncoding::Utf8);
        assert_eq!(XmlEncoding::Utf8.bom_len(&input), 3);
    }

    #[test]
    fn test_detect_utf16() {
        assert_eq!(XmlEncoding::detect(&[0xFF, 0xFE, b'<', 0x00]), XmlEncoding::Utf16Le);
        assert_eq!(XmlEncoding::detect(&[0xFE, 0xFF, 0x00, b'<']), XmlEncoding::Utf16Be);
        assert_eq!(XmlEncoding::detect(&[b'<', 0x00]), XmlEncoding::Utf16Le);
        assert_eq!(XmlEncoding::Utf16Le.bom_len(&[b'<', 0x00]), 0);
    }

    #[test]
    fn test_decode_le_in_one_go() {
        let mut decoder = Utf16Decoder::new(XmlEncoding::Utf16Le);
        let mut out = Vec::new();
        decoder.decode(&utf16_le("<r/>"), true, &mut out).unwrap();
        assert_eq!(out, b"<r/>");
    }

    #[test]
    fn test_decode_be_byte_by_byte_with_surrogates() {
        let text = "<r>\u{1F600}é</r>";
        let mut decoder = Utf16Decoder::new(XmlEncoding::Utf16Be);
        let mut out = Vec::new();
        let bytes = utf16_be(text);
        for (i, b) in bytes.iter().enumerate() {
            decoder.decode(&[*b], i + 1 == bytes.len(), &mut out).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), text);
    }

    #[test]
    fn test_decode_odd_length() {
        let mut decoder = Utf16Decoder::new(XmlEncoding::Utf16Le);
        let mut out = Vec::new();
        assert!(decoder.decode(&[b'<', 0x00, b'r'], true, &mut out).is_err());
    }

    #[test]
    fn test_decode_lone_surrogate() {
        let mut decoder = Utf16Decoder::new(XmlEncoding::Utf16Le);
        let mut out = Vec::new();
        assert!(decoder.decode(&[0x00, 0xDC, b'a', 0x00], true, &mut out).is_err());
    }
}
