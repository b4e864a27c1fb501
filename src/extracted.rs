//! Flattening a parsed tree into user-facing email content
//!
//! Walks terminal parts in document order and routes each one to plain text,
//! HTML or the attachment list. One level of nested multipart (the ubiquitous
//! multipart/alternative inside multipart/mixed) is merged into the same
//! flat result; anything nested deeper is kept as raw text instead of being
//! dropped.

use crate::decoder;
use crate::error::{EmlError, Result};
use crate::parser;
use crate::types::{
    Address, AddressField, Attachment, Email, HeaderMap, MultipartAlternative, ParseOptions, Part,
    PartBody, ReadInput, CONTENT_DISPOSITION_KEYS, CONTENT_TYPE_KEYS, TRANSFER_ENCODING_KEYS,
};
use chrono::{DateTime, Utc};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

const DATE_KEYS: &[&str] = &["Date", "date"];
const SUBJECT_KEYS: &[&str] = &["Subject", "subject"];
const FROM_KEYS: &[&str] = &["From", "from"];
const TO_KEYS: &[&str] = &["To", "to"];
const CC_KEYS: &[&str] = &["Cc", "CC", "cc"];

/// Extract a flat [`Email`] from raw EML text or a previously parsed tree.
pub fn read<'a, I>(input: I, options: &ParseOptions) -> Result<Email>
where
    I: Into<ReadInput<'a>>,
{
    match input.into() {
        ReadInput::Raw(raw) => {
            let tree = parser::parse(raw, options)?;
            extract_guarded(&tree, options)
        }
        ReadInput::Tree(tree) => extract_guarded(tree, options),
    }
}

/// Like [`read`], invoking `callback` with the outcome before returning it.
pub fn read_with<'a, I, F>(input: I, options: &ParseOptions, callback: F) -> Result<Email>
where
    I: Into<ReadInput<'a>>,
    F: FnOnce(&Result<Email>),
{
    let outcome = read(input, options);
    callback(&outcome);
    outcome
}

/// The walk must never escape as a panic; surface one as a regular error.
fn extract_guarded(tree: &Part, options: &ParseOptions) -> Result<Email> {
    catch_unwind(AssertUnwindSafe(|| extract(tree, options))).unwrap_or_else(|panic| {
        let detail = panic
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic during extraction".to_string());
        Err(EmlError::ExtractionFailure(detail))
    })
}

fn extract(tree: &Part, options: &ParseOptions) -> Result<Email> {
    if tree.headers.is_empty() {
        return Err(EmlError::MissingHeaders);
    }

    let mut email = Email {
        date: tree.headers.first_of(DATE_KEYS).and_then(parse_date),
        subject: tree
            .headers
            .first_of(SUBJECT_KEYS)
            .map(decoder::decode_header_value),
        from: tree.headers.first_of(FROM_KEYS).and_then(parse_address_field),
        to: tree.headers.first_of(TO_KEYS).and_then(parse_address_field),
        cc: tree.headers.first_of(CC_KEYS).and_then(parse_address_field),
        headers: tree.headers.clone(),
        ..Email::default()
    };

    match &tree.body {
        PartBody::None => {
            if options.verbose {
                debug!("tree has no body, returning header-only result");
            }
        }
        PartBody::Text(body) => append_leaf(&mut email, &tree.headers, body, options),
        PartBody::Multipart(boundaries) => {
            for boundary in boundaries {
                let part = &boundary.part;
                match &part.body {
                    PartBody::None => {
                        if options.verbose {
                            debug!(
                                delimiter = %boundary.delimiter,
                                "boundary part has no body, skipped"
                            );
                        }
                    }
                    PartBody::Text(body) => append_leaf(&mut email, &part.headers, body, options),
                    PartBody::Multipart(nested) => {
                        if email.multipart_alternative.is_none()
                            && let Some(content_type) = part.headers.first_of(CONTENT_TYPE_KEYS)
                        {
                            email.multipart_alternative = Some(MultipartAlternative {
                                content_type: content_type.to_string(),
                            });
                        }
                        for inner in nested {
                            match &inner.part.body {
                                PartBody::None => {
                                    if options.verbose {
                                        debug!(
                                            delimiter = %inner.delimiter,
                                            "nested part has no body, skipped"
                                        );
                                    }
                                }
                                PartBody::Text(body) => {
                                    append_leaf(&mut email, &inner.part.headers, body, options);
                                }
                                PartBody::Multipart(_) => {
                                    warn!(
                                        delimiter = %inner.delimiter,
                                        "multipart nested deeper than one level, keeping raw text"
                                    );
                                    push_raw_text(&mut email, &inner.part);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    if options.verbose {
        debug!(
            attachments = email.attachments.len(),
            has_text = email.text.is_some(),
            has_html = email.html.is_some(),
            "extracted email content"
        );
    }
    Ok(email)
}

/// Route one terminal part into the flat result.
///
/// Parts without a Content-Disposition count as message content: HTML when
/// the Content-Type says so, plain text when it says `text/plain` or is
/// absent entirely. Everything else, including `inline` parts, becomes an
/// attachment.
fn append_leaf(email: &mut Email, headers: &HeaderMap, raw: &str, options: &ParseOptions) {
    let content_type = headers.first_of(CONTENT_TYPE_KEYS);
    let disposition = headers.first_of(CONTENT_DISPOSITION_KEYS);
    let encoding = headers.first_of(TRANSFER_ENCODING_KEYS);
    let charset_label = content_type.and_then(decoder::charset_param);
    let content = decoder::decode_content(raw, content_type, encoding, options);

    let no_disposition = disposition.is_none();
    let is_html = no_disposition && content_type.is_some_and(|ct| ct.contains("text/html"));
    let is_text = no_disposition && content_type.is_none_or(|ct| ct.contains("text/plain"));

    if is_html {
        let mut html = decoder::content_into_text(content, charset_label.as_deref());
        html = html.replace("\r\n", "").replace('\n', "");
        html = html.replace("\\\"", "\"");
        if options.unwrap_double_base64
            && let Some(inner) = decoder::unwrap_double_base64(&html)
        {
            if options.verbose {
                debug!("unwrapped double Base64-encoded HTML part");
            }
            html = inner;
        }
        append_to(&mut email.html, &html);
        email.html_headers = Some(headers.clone());
    } else if is_text {
        let text = decoder::content_into_text(content, charset_label.as_deref());
        append_to(&mut email.text, &text);
        email.text_headers = Some(headers.clone());
    } else {
        let meta = decoder::attachment_meta(headers);
        email.attachments.push(Attachment {
            name: meta.name,
            content_type: content_type.map(str::to_string),
            content_id: meta.content_id,
            inline: meta.inline,
            size: meta.size,
            content,
        });
        if options.verbose {
            debug!(count = email.attachments.len(), "collected attachment");
        }
    }
}

fn append_to(slot: &mut Option<String>, content: &str) {
    match slot {
        Some(existing) => existing.push_str(content),
        None => *slot = Some(content.to_string()),
    }
}

/// Keep the raw text of parts too deeply nested to dispatch.
fn push_raw_text(email: &mut Email, part: &Part) {
    match &part.body {
        PartBody::Text(text) => append_to(&mut email.data, text),
        PartBody::Multipart(nested) => {
            for inner in nested {
                push_raw_text(email, &inner.part);
            }
        }
        PartBody::None => {}
    }
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    match DateTime::parse_from_rfc2822(trimmed).or_else(|_| DateTime::parse_from_rfc3339(trimmed))
    {
        Ok(date) => Some(date.with_timezone(&Utc)),
        Err(err) => {
            warn!(error = %err, date = trimmed, "unparsable Date header");
            None
        }
    }
}

/// Parse an address header into the field shape, decoding encoded-words
/// first so internationalized display names survive.
fn parse_address_field(value: &str) -> Option<AddressField> {
    let decoded = decoder::decode_header_value(value);
    let parsed = match mailparse::addrparse(&decoded) {
        Ok(list) => list,
        Err(err) => {
            warn!(error = %err, "unparsable address header");
            return None;
        }
    };

    let mut addresses = Vec::new();
    for entry in parsed.iter() {
        match entry {
            mailparse::MailAddr::Single(single) => addresses.push(convert_single(single)),
            mailparse::MailAddr::Group(group) => {
                if group.addrs.is_empty() {
                    addresses.push(Address {
                        name: Some(group.group_name.clone()),
                        email: None,
                    });
                } else {
                    addresses.extend(group.addrs.iter().map(convert_single));
                }
            }
        }
    }
    AddressField::from_list(addresses)
}

fn convert_single(single: &mailparse::SingleInfo) -> Address {
    Address {
        name: single
            .display_name
            .clone()
            .filter(|name| !name.is_empty()),
        email: Some(single.addr.clone()),
    }
}
