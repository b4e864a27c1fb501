//! Core types for parsed MIME trees and extracted emails

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Header lookup is case-sensitive. These are the spellings of each
/// structural header that occur in real mail, probed in order.
pub(crate) const CONTENT_TYPE_KEYS: &[&str] = &["Content-Type", "Content-type"];
pub(crate) const CONTENT_DISPOSITION_KEYS: &[&str] =
    &["Content-Disposition", "Content-disposition"];
pub(crate) const TRANSFER_ENCODING_KEYS: &[&str] =
    &["Content-Transfer-Encoding", "Content-transfer-encoding"];
pub(crate) const CONTENT_ID_KEYS: &[&str] = &["Content-ID", "Content-Id", "Content-id"];

/// Ordered header map with case-preserving, case-sensitive names.
///
/// Every name is stored once; a repeated name appends another value to the
/// existing entry, so values are uniformly a list of length >= 1. This keeps
/// headers such as `Received` intact in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderMap {
    /// Create an empty header map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a header value, promoting the entry to a list when the name repeats
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some((_, values)) = self.entries.iter_mut().find(|(n, _)| n == name) {
            values.push(value);
        } else {
            self.entries.push((name.to_string(), vec![value]));
        }
    }

    /// Append folded-continuation text to the most recent value of `name`,
    /// preserving the line break that carried it
    pub fn append_to_last_value(&mut self, name: &str, continuation: &str) {
        if let Some((_, values)) = self.entries.iter_mut().find(|(n, _)| n == name)
            && let Some(last) = values.last_mut()
        {
            last.push_str("\r\n");
            last.push_str(continuation);
        }
    }

    /// First value recorded for an exactly-spelled name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// All values recorded for an exactly-spelled name
    #[must_use]
    pub fn all(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map_or(&[], |(_, values)| values.as_slice())
    }

    /// First value found among several spellings of a name
    #[must_use]
    pub fn first_of(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }

    /// Whether an exactly-spelled name is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Number of distinct header names
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no headers were recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

// Single values serialize as a bare string and repeated values as a list,
// mirroring the shape callers see in serialized trees.
impl Serialize for HeaderMap {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, values) in &self.entries {
            if let [single] = values.as_slice() {
                map.serialize_entry(name, single)?;
            } else {
                map.serialize_entry(name, values)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HeaderMap {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        struct HeaderMapVisitor;

        impl<'de> Visitor<'de> for HeaderMapVisitor {
            type Value = HeaderMap;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of header names to a string or a list of strings")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut headers = HeaderMap::new();
                while let Some((name, value)) = access.next_entry::<String, OneOrMany>()? {
                    match value {
                        OneOrMany::One(single) => headers.entries.push((name, vec![single])),
                        OneOrMany::Many(values) if !values.is_empty() => {
                            headers.entries.push((name, values));
                        }
                        OneOrMany::Many(_) => {}
                    }
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeaderMapVisitor)
    }
}

/// One node of a parsed MIME tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Headers of this part
    pub headers: HeaderMap,

    /// Body of this part, unset while only headers were requested
    #[serde(default, skip_serializing_if = "PartBody::is_none")]
    pub body: PartBody,
}

/// Body of a [`Part`]: unset, an opaque string, or resolved sub-boundaries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartBody {
    /// No body was parsed for this part
    #[default]
    None,

    /// Opaque body text, still transfer-encoded
    Text(String),

    /// Resolved multipart children, in document order
    Multipart(Vec<Boundary>),
}

impl PartBody {
    /// Whether no body was parsed
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Opaque body text, when this is a terminal part
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Resolved children, empty unless this is a multipart body
    #[must_use]
    pub fn boundaries(&self) -> &[Boundary] {
        match self {
            Self::Multipart(boundaries) => boundaries.as_slice(),
            _ => &[],
        }
    }
}

/// A resolved boundary block: the marker token and the part it delimited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// Boundary token as written in the opening marker line, without the
    /// leading `--`
    pub delimiter: String,

    /// The part parsed from the lines the marker delimited
    pub part: Part,
}

/// Per-call parsing and extraction options.
///
/// Carried by value through every stage, so concurrent calls with different
/// settings never interfere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Stop scanning at the first blank line and leave every body unset
    pub headers_only: bool,

    /// Emit `tracing` debug events for parser and extractor decisions
    pub verbose: bool,

    /// Decode HTML bodies a second time when the decoded text itself
    /// round-trips as canonical Base64. Heuristic, so off by default.
    pub unwrap_double_base64: bool,
}

/// Input accepted by [`read`](crate::read): raw EML text or an already
/// parsed tree
#[derive(Debug, Clone, Copy)]
pub enum ReadInput<'a> {
    /// Raw EML text, parsed before extraction
    Raw(&'a str),

    /// Root of a previously parsed tree
    Tree(&'a Part),
}

impl<'a> From<&'a str> for ReadInput<'a> {
    fn from(raw: &'a str) -> Self {
        Self::Raw(raw)
    }
}

impl<'a> From<&'a String> for ReadInput<'a> {
    fn from(raw: &'a String) -> Self {
        Self::Raw(raw)
    }
}

impl<'a> From<&'a Part> for ReadInput<'a> {
    fn from(tree: &'a Part) -> Self {
        Self::Tree(tree)
    }
}

/// A single mailbox parsed from an address header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Display name, unset when the header carried a bare address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Address proper, unset for a group with no listed mailboxes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.email) {
            (Some(name), Some(email)) => write!(f, "{name} <{email}>"),
            (Some(name), None) => write!(f, "{name}"),
            (None, Some(email)) => write!(f, "{email}"),
            (None, None) => Ok(()),
        }
    }
}

/// One or several addresses.
///
/// A header naming a single mailbox stays a bare [`Address`] and one naming
/// several becomes a list, so serialized results keep the shape consumers of
/// the historical format expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressField {
    /// Exactly one mailbox
    Single(Address),

    /// Two or more mailboxes, in header order
    List(Vec<Address>),
}

impl AddressField {
    /// Fold an ordered list into the field shape; `None` when empty
    #[must_use]
    pub fn from_list(mut addresses: Vec<Address>) -> Option<Self> {
        match addresses.len() {
            0 => None,
            1 => addresses.pop().map(Self::Single),
            _ => Some(Self::List(addresses)),
        }
    }

    /// First mailbox in the field
    #[must_use]
    pub fn first(&self) -> Option<&Address> {
        match self {
            Self::Single(address) => Some(address),
            Self::List(addresses) => addresses.first(),
        }
    }

    /// Number of mailboxes in the field
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::List(addresses) => addresses.len(),
        }
    }

    /// Whether the field holds no mailboxes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded body payload: text when a charset applied, raw bytes otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Decoded text
    Text(String),

    /// Decoded bytes with no charset interpretation
    Binary(Vec<u8>),
}

impl Content {
    /// Decoded text, when this payload is textual
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Payload bytes regardless of variant
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// Payload length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// A non-text leaf collected during extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name from Content-Disposition or Content-Type, percent-decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Content-Type header value, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Content-ID with the surrounding angle brackets removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,

    /// Whether the part was declared `inline`
    #[serde(default)]
    pub inline: bool,

    /// Declared `size` parameter, zero when absent
    #[serde(default)]
    pub size: u64,

    /// Decoded payload
    pub content: Content,
}

/// Record of the multipart/alternative group merged during extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartAlternative {
    /// Content-Type header value of the nested multipart, verbatim
    pub content_type: String,
}

/// Flat, user-facing result of [`read`](crate::read)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Email {
    /// Parsed Date header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,

    /// Subject with encoded-words decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Sender(s) from the From header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<AddressField>,

    /// Recipients from the To header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<AddressField>,

    /// Recipients from the Cc header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<AddressField>,

    /// All root headers, verbatim
    pub headers: HeaderMap,

    /// Concatenated plain-text bodies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Concatenated HTML bodies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Headers of the last plain-text part encountered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_headers: Option<HeaderMap>,

    /// Headers of the last HTML part encountered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_headers: Option<HeaderMap>,

    /// Attachments in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    /// Set when a nested multipart/alternative group was merged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multipart_alternative: Option<MultipartAlternative>,

    /// Raw text of parts nested too deep to dispatch, in document order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}
