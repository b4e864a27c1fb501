// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Lenient EML Parser and Content Extractor
//!
//! Parses raw EML (RFC 822 with MIME) text into a structured part tree and
//! flattens that tree into user-facing content: plain text, HTML bodies,
//! attachments and address fields.
//!
//! Real-world mail violates the RFCs constantly, so parsing is best-effort
//! throughout: missing blank lines, unclosed boundary series, absent Base64
//! padding and unknown charsets all degrade gracefully instead of failing.
//!
//! # Features
//!
//! - Two-level API: [`parse`] for the raw MIME tree, [`read`] for flat content
//! - Header folding and repeated headers preserved in order
//! - Recursive multipart resolution with lenient boundary handling
//! - Base64 and quoted-printable transfer decoding, charset conversion
//! - RFC 2047 encoded-word decoding in headers
//! - Attachment metadata: names, Content-ID, inline disposition, size
//!
//! # Example
//!
//! ```rust
//! use eml_extract::{read, ParseOptions};
//!
//! let raw = "From: Ada <ada@example.com>\r\n\
//!            Subject: Hi\r\n\
//!            Content-Type: text/plain\r\n\
//!            \r\n\
//!            Hello";
//! let email = read(raw, &ParseOptions::default()).unwrap();
//!
//! assert_eq!(email.subject.as_deref(), Some("Hi"));
//! assert_eq!(email.text.as_deref(), Some("Hello"));
//! ```

mod charset;
mod decoder;
mod error;
mod extracted;
mod parser;
mod types;

pub use decoder::{decode_header_value, unquote_printable};
pub use error::{EmlError, Result};
pub use extracted::{read, read_with};
pub use parser::{parse, parse_with};
pub use types::*;
