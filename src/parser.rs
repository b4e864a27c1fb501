//! EML parsing into a structured part tree
//!
//! The parser is deliberately lenient. Real-world mail omits blank lines,
//! closing boundary markers and padding, so every irregularity that can be
//! absorbed is absorbed; an error is raised only when the structure itself
//! is undecidable (no usable input, or a multipart without a boundary).

use crate::error::{EmlError, Result};
use crate::types::{Boundary, HeaderMap, ParseOptions, Part, PartBody, CONTENT_TYPE_KEYS};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static HEADER_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([\w-]+):\s*(.*)$").unwrap());

static BOUNDARY_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)boundary\s*=\s*(?:"([^"]*)"|([^\s;]+))"#).unwrap());

/// Parse raw EML text into its part tree.
///
/// Returns the root [`Part`]. Bodies of multipart parts are resolved
/// recursively, so the returned tree needs no further boundary handling.
pub fn parse(raw: &str, options: &ParseOptions) -> Result<Part> {
    if raw.trim().is_empty() {
        return Err(EmlError::InvalidInput("empty EML text".to_string()));
    }
    let lines = split_lines(raw);
    let tree = parse_part(&lines, options)?;
    if options.verbose {
        debug!(headers = tree.headers.len(), "parsed EML part tree");
    }
    Ok(tree)
}

/// Like [`parse`], invoking `callback` with the outcome before returning it.
pub fn parse_with<F>(raw: &str, options: &ParseOptions, callback: F) -> Result<Part>
where
    F: FnOnce(&Result<Part>),
{
    let outcome = parse(raw, options);
    callback(&outcome);
    outcome
}

/// Split on `\n` and drop a trailing `\r` per line, so CRLF and bare-LF
/// input parse identically.
fn split_lines(raw: &str) -> Vec<&str> {
    raw.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

fn parse_part(lines: &[&str], options: &ParseOptions) -> Result<Part> {
    let mut headers = HeaderMap::new();
    let mut last_name: Option<String> = None;
    let mut marker_prefix: Option<String> = None;
    let mut body_start: Option<usize> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        // A boundary marker may arrive with no blank line after the headers.
        if let Some(prefix) = &marker_prefix
            && line.starts_with(prefix.as_str())
        {
            if options.verbose {
                debug!("boundary marker before blank line, header scan ends");
            }
            body_start = Some(i);
            break;
        }

        if line.is_empty() {
            if options.headers_only {
                break;
            }
            if headers.first_of(CONTENT_TYPE_KEYS).is_none() {
                // Some senders put a stray blank line ahead of Content-Type.
                let next = lines[i + 1..].iter().find(|next| !next.is_empty());
                if next.is_some_and(|next| next.starts_with("Content-Type")) {
                    if options.verbose {
                        debug!("blank line before Content-Type, header scan continues");
                    }
                    i += 1;
                    continue;
                }
                if options.verbose {
                    debug!("part has no Content-Type header");
                }
            }
            body_start = Some(i + 1);
            break;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            match &last_name {
                Some(name) => {
                    headers.append_to_last_value(name, line.trim());
                    if marker_prefix.is_none() && CONTENT_TYPE_KEYS.contains(&name.as_str()) {
                        marker_prefix = declared_marker_prefix(&headers);
                    }
                }
                None => {
                    if options.verbose {
                        debug!(line, "continuation line before any header, skipped");
                    }
                }
            }
            i += 1;
            continue;
        }

        if let Some(caps) = HEADER_LINE.captures(line) {
            let name = &caps[1];
            let value = &caps[2];
            headers.insert(name, value);
            if marker_prefix.is_none() && CONTENT_TYPE_KEYS.contains(&name) {
                marker_prefix = declared_marker_prefix(&headers);
            }
            last_name = Some(name.to_string());
            i += 1;
            continue;
        }

        if options.verbose {
            debug!(line, "unrecognized header line, skipped");
        }
        i += 1;
    }

    // The boundary parameter may sit on a folded continuation line, so the
    // multipart declaration is inspected only once its value is complete.
    let boundary = match headers.first_of(CONTENT_TYPE_KEYS) {
        Some(value) if is_multipart(value) => Some(boundary_param(value)?),
        _ => None,
    };

    if options.headers_only {
        return Ok(Part {
            headers,
            body: PartBody::None,
        });
    }

    let Some(start) = body_start else {
        return Ok(Part {
            headers,
            body: PartBody::None,
        });
    };

    let body = match boundary {
        Some(token) => PartBody::Multipart(parse_boundaries(&lines[start..], &token, options)?),
        None => PartBody::Text(lines[start..].join("\r\n")),
    };
    Ok(Part { headers, body })
}

/// Scan body lines for `--token` boundary markers, collecting the lines of
/// each delimited block and parsing every block as a part of its own.
///
/// Text before the first marker and after the closing marker is discarded.
/// A series that never closes is resolved anyway once the lines run out.
fn parse_boundaries(lines: &[&str], token: &str, options: &ParseOptions) -> Result<Vec<Boundary>> {
    let open_prefix = format!("--{token}");
    let close_prefix = format!("--{token}--");
    let mut resolved = Vec::new();
    let mut open: Option<(String, Vec<&str>)> = None;

    for &line in lines {
        if line.starts_with(&close_prefix) {
            if let Some((delimiter, collected)) = open.take() {
                resolved.push(resolve_boundary(delimiter, &collected, options)?);
            }
            if options.verbose {
                debug!(token, "boundary series closed");
            }
            continue;
        }
        if line.starts_with(&open_prefix) {
            if let Some((delimiter, collected)) = open.take() {
                resolved.push(resolve_boundary(delimiter, &collected, options)?);
            }
            open = Some((marker_token(line)?, Vec::new()));
            continue;
        }
        if let Some((_, collected)) = open.as_mut() {
            collected.push(line);
        }
    }

    if let Some((delimiter, collected)) = open.take() {
        if options.verbose {
            debug!(token, "boundary series never closed, resolving final part");
        }
        resolved.push(resolve_boundary(delimiter, &collected, options)?);
    }

    Ok(resolved)
}

fn resolve_boundary(delimiter: String, lines: &[&str], options: &ParseOptions) -> Result<Boundary> {
    let part = parse_part(lines, options)?;
    Ok(Boundary { delimiter, part })
}

/// The boundary token as written on an opening marker line.
fn marker_token(line: &str) -> Result<String> {
    let trimmed = line.trim_end();
    let token = trimmed.strip_prefix("--").unwrap_or(trimmed);
    if token.is_empty() {
        return Err(EmlError::MalformedBoundaryMarker(line.to_string()));
    }
    Ok(token.to_string())
}

/// The boundary parameter of a multipart Content-Type value.
fn boundary_param(content_type: &str) -> Result<String> {
    let token = BOUNDARY_PARAM
        .captures(content_type)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim())
        .unwrap_or("");
    if token.is_empty() {
        return Err(EmlError::MalformedBoundaryMarker(content_type.to_string()));
    }
    Ok(token.to_string())
}

/// The `--token` prefix of the boundary declared by the headers so far.
///
/// Folding can leave the parameter on a continuation line that has not
/// been appended yet, so a multipart value without one is not an error.
fn declared_marker_prefix(headers: &HeaderMap) -> Option<String> {
    let value = headers.first_of(CONTENT_TYPE_KEYS)?;
    if !is_multipart(value) {
        return None;
    }
    boundary_param(value).ok().map(|token| format!("--{token}"))
}

fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..10)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"))
}
