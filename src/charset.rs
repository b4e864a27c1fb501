//! Charset conversion between raw bytes and text
//!
//! Thin facade over `encoding_rs`. Lookups are lenient: an unknown label
//! falls back to UTF-8 with replacement characters instead of failing, since
//! real-world mail carries misspelled and outright invented charset names.

use encoding_rs::{Encoding, UTF_8};
use tracing::warn;

/// Decode `bytes` into text using the encoding named by `label`.
pub(crate) fn decode(bytes: &[u8], label: &str) -> String {
    let encoding = lookup(label);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!(
            charset = encoding.name(),
            "malformed byte sequences replaced during charset decode"
        );
    }
    text.into_owned()
}

/// Encode text back into bytes. Output is always UTF-8.
pub(crate) fn encode(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// Remap bytes from the encoding named by `label` into UTF-8 bytes.
pub(crate) fn convert(bytes: &[u8], label: &str) -> Vec<u8> {
    encode(&decode(bytes, label))
}

/// Strip a charset label down to lowercase alphanumerics for comparison,
/// e.g. `"UTF-8"`, `utf_8` and `utf8` all normalize to `utf8`.
pub(crate) fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Whether `label` names UTF-8 (or something we treat as it).
pub(crate) fn is_utf8(label: &str) -> bool {
    normalize_label(label) == "utf8" || lookup(label) == UTF_8
}

/// Whether the label or a whole Content-Type value references a GB codepage.
pub(crate) fn is_gb(label_or_value: &str) -> bool {
    let normalized = normalize_label(label_or_value);
    normalized.contains("gb2312") || normalized.contains("gbk") || normalized.contains("gb18030")
}

fn lookup(label: &str) -> &'static Encoding {
    Encoding::for_label(label.trim().trim_matches('"').as_bytes()).unwrap_or_else(|| {
        warn!(label, "unknown charset label, falling back to UTF-8");
        UTF_8
    })
}
