//! XML Reader Module
//!
//! Byte sourcing for the lexer:
//! - BufferedReader: compacting read buffer over any `Read`, with encoding
//!   detection and position tracking

pub mod buffered;
