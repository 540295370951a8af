//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML parsing:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Entities: XML entity decoding with Cow (zero-copy when possible)
//! - DTD: internal subset entity declarations
//! - Attributes: Attribute parsing and extraction
//! - Encoding: UTF-16 detection and conversion to UTF-8
//! - Lexer: streaming push lexer with ContentHandler/ErrorHandler callbacks

pub mod attributes;
pub mod dtd;
pub mod encoding;
pub mod entities;
pub mod lexer;
pub mod scanner;
