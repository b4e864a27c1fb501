//! Transfer-encoding and header-value decoding
//!
//! Turns the opaque body text the parser leaves in terminal parts into
//! usable payloads, and decodes RFC 2047 encoded-words in header values.
//! Decoding is lenient throughout: a payload that cannot be decoded is kept
//! as literal text rather than dropped.

use crate::charset;
use crate::types::{Content, HeaderMap, ParseOptions, CONTENT_DISPOSITION_KEYS, CONTENT_ID_KEYS};
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{alphabet, Engine};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Mail in the wild routinely omits Base64 padding, so decoding must not
/// insist on it. Encoding (used by the double-Base64 probe) stays canonical.
const BASE64_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static ENCODED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\?([^?]+)\?([BbQq])\?([^?]*)\?=").unwrap());

static CHARSET_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*"?([^";\s]+)"?"#).unwrap());

static NAME_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:file)?name\s*=\s*(?:"([^"]*)"|([^\s;]+))"#).unwrap()
});

static SIZE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)size\s*=\s*"?(\d+)"?"#).unwrap());

/// Name parameters are taken from Content-Disposition first, then
/// Content-Type, matching where senders actually put them.
const NAME_SCAN_KEYS: &[&str] = &[
    "Content-Disposition",
    "Content-disposition",
    "Content-Type",
    "Content-type",
];

/// Decode a terminal part's opaque body according to its declared
/// Content-Transfer-Encoding.
pub(crate) fn decode_content(
    raw: &str,
    content_type: Option<&str>,
    encoding: Option<&str>,
    options: &ParseOptions,
) -> Content {
    let normalized = encoding.map(|value| value.trim().to_ascii_lowercase());
    if options.verbose {
        debug!(
            encoding = normalized.as_deref().unwrap_or("none"),
            "transfer-decoding terminal content"
        );
    }
    match normalized.as_deref() {
        Some("base64") => decode_base64_content(raw, content_type),
        Some("quoted-printable") => {
            let charset_label = content_type.and_then(charset_param);
            Content::Text(unquote_printable(raw, charset_label.as_deref(), false))
        }
        Some("8bit" | "binary" | "8bitmime" | "binarymime") => {
            let charset_label = content_type.and_then(charset_param);
            match charset_label {
                Some(label) if !charset::is_utf8(&label) => {
                    Content::Text(charset::decode(raw.as_bytes(), &label))
                }
                _ => Content::Text(raw.to_string()),
            }
        }
        _ => Content::Text(raw.to_string()),
    }
}

fn decode_base64_content(raw: &str, content_type: Option<&str>) -> Content {
    let compact: String = raw.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
    match BASE64_LENIENT.decode(compact.trim()) {
        Ok(bytes) => {
            if content_type.is_some_and(charset::is_gb) {
                // GB codepages are remapped to UTF-8 before text adoption
                let label = content_type.and_then(charset_param);
                let remapped = charset::convert(&bytes, label.as_deref().unwrap_or("gb2312"));
                Content::Text(charset::decode(&remapped, "utf-8"))
            } else {
                Content::Binary(bytes)
            }
        }
        Err(err) => {
            warn!(error = %err, "Base64 body failed to decode, keeping literal text");
            Content::Text(raw.to_string())
        }
    }
}

/// Adopt decoded content as text, interpreting binary payloads with the
/// part's declared charset (UTF-8 when none was declared).
pub(crate) fn content_into_text(content: Content, charset_label: Option<&str>) -> String {
    match content {
        Content::Text(text) => text,
        Content::Binary(bytes) => charset::decode(&bytes, charset_label.unwrap_or("utf-8")),
    }
}

/// Decode quoted-printable text into a string.
///
/// Trailing transport whitespace is stripped per line, a trailing `=` joins
/// the next line (soft break), `=HH` escapes become bytes and an invalid
/// escape keeps its literal `=`. With `q_encoding` set, `_` additionally
/// decodes to a space (the RFC 2047 Q variant used inside encoded-words).
#[must_use]
pub fn unquote_printable(raw: &str, charset_label: Option<&str>, q_encoding: bool) -> String {
    let mut joined = String::with_capacity(raw.len());
    let mut lines = raw.split('\n').peekable();
    while let Some(line) = lines.next() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let line = line.trim_end_matches([' ', '\t']);
        if let Some(stem) = line.strip_suffix('=') {
            joined.push_str(stem);
        } else {
            joined.push_str(line);
            if lines.peek().is_some() {
                joined.push_str("\r\n");
            }
        }
    }

    let bytes = joined.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'=' if i + 2 < bytes.len() => {
                if let Some(byte) = hex_byte(bytes[i + 1], bytes[i + 2]) {
                    decoded.push(byte);
                    i += 3;
                } else {
                    decoded.push(b'=');
                    i += 1;
                }
            }
            b'_' if q_encoding => {
                decoded.push(b' ');
                i += 1;
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }
    charset::decode(&decoded, charset_label.unwrap_or("utf-8"))
}

/// Decode every RFC 2047 encoded-word (`=?charset?B|Q?payload?=`) in a
/// header value, leaving the rest of the string verbatim.
///
/// A word whose payload fails to decode is kept literally. Line breaks left
/// over from header folding are removed from the final string.
#[must_use]
pub fn decode_header_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut last = 0;
    for caps in ENCODED_WORD.captures_iter(value) {
        let Some(whole) = caps.get(0) else { continue };
        result.push_str(&value[last..whole.start()]);

        let charset_label = caps.get(1).map_or("utf-8", |m| m.as_str());
        // RFC 2231 permits a trailing language tag after `*`
        let charset_label = charset_label.split('*').next().unwrap_or(charset_label);
        let kind = caps.get(2).map_or("", |m| m.as_str());
        let payload = caps.get(3).map_or("", |m| m.as_str());

        if kind.eq_ignore_ascii_case("B") {
            match BASE64_LENIENT.decode(payload) {
                Ok(bytes) => result.push_str(&charset::decode(&bytes, charset_label)),
                Err(err) => {
                    warn!(
                        error = %err,
                        word = whole.as_str(),
                        "encoded-word failed to decode, keeping literal"
                    );
                    result.push_str(whole.as_str());
                }
            }
        } else {
            result.push_str(&unquote_printable(payload, Some(charset_label), true));
        }
        last = whole.end();
    }
    result.push_str(&value[last..]);

    if result.contains('\n') {
        result = result.replace("\r\n", "").replace('\n', "");
    }
    result
}

/// Extract the charset parameter from a Content-Type value.
pub(crate) fn charset_param(content_type: &str) -> Option<String> {
    CHARSET_PARAM
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches('"').to_string())
}

/// Attachment metadata taken from a terminal part's headers.
pub(crate) struct AttachmentMeta {
    pub name: Option<String>,
    pub content_id: Option<String>,
    pub inline: bool,
    pub size: u64,
}

pub(crate) fn attachment_meta(headers: &HeaderMap) -> AttachmentMeta {
    let name = scan_param(headers, &NAME_PARAM).map(|raw| percent_decode(&raw));
    let content_id = headers.first_of(CONTENT_ID_KEYS).map(|id| {
        id.trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .to_string()
    });
    let inline = headers
        .first_of(CONTENT_DISPOSITION_KEYS)
        .is_some_and(|disposition| disposition.trim_start().starts_with("inline"));
    let size = scan_param(headers, &SIZE_PARAM)
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0);
    AttachmentMeta {
        name,
        content_id,
        inline,
        size,
    }
}

fn scan_param(headers: &HeaderMap, param: &Regex) -> Option<String> {
    for key in NAME_SCAN_KEYS {
        if let Some(value) = headers.get(key)
            && let Some(caps) = param.captures(value)
            && let Some(m) = caps.get(1).or_else(|| caps.get(2))
        {
            return Some(m.as_str().to_string());
        }
    }
    None
}

/// Decode URI percent escapes in an attachment name. A malformed escape
/// keeps the whole name literal instead of producing a torn string.
fn percent_decode(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = match (bytes.get(i + 1), bytes.get(i + 2)) {
                (Some(&high), Some(&low)) => hex_byte(high, low),
                _ => None,
            };
            let Some(byte) = escape else {
                warn!(name, "malformed percent escape in attachment name, keeping literal");
                return name.to_string();
            };
            decoded.push(byte);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).unwrap_or_else(|_| name.to_string())
}

/// Unwrap HTML that arrived Base64-encoded twice.
///
/// Returns the inner text only when `candidate` round-trips exactly,
/// i.e. `encode(decode(candidate)) == candidate`, and the decoded bytes are
/// valid UTF-8.
pub(crate) fn unwrap_double_base64(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }
    let bytes = STANDARD.decode(trimmed).ok()?;
    if STANDARD.encode(&bytes) != trimmed {
        return None;
    }
    String::from_utf8(bytes).ok()
}

const fn hex_byte(high: u8, low: u8) -> Option<u8> {
    match (hex_digit(high), hex_digit(low)) {
        (Some(h), Some(l)) => Some((h << 4) | l),
        _ => None,
    }
}

const fn hex_digit(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}
