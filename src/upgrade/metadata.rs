//! Tolerant field scanner for release metadata.
//!
//! The release document is treated as untrusted, semi-structured text rather
//! than parsed as a full JSON tree. Only flat string fields are read:
//!
//! 1. Find the first `"<key>"` that is followed by `:` (whitespace allowed).
//! 2. Skip whitespace, expect an opening quote.
//! 3. Read verbatim up to the first unescaped closing quote, giving up once
//!    the value exceeds its bound.
//!
//! Every index is checked, so truncated or hostile input yields a
//! [`ParseError`] instead of a panic.

use crate::constants::{MAX_URL_LEN, MAX_VERSION_LEN};
use crate::core::ParseError;
use serde::Serialize;
use tracing::debug;

/// Display name of the release, possibly platform-qualified (`Linux-v2.3.0`).
pub const NAME_FIELD: &str = "name";

/// Canonical tag of the release (`v2.3.0`).
pub const TAG_FIELD: &str = "tag_name";

/// Asset download link; the first one in the document is the binary.
pub const DOWNLOAD_URL_FIELD: &str = "browser_download_url";

/// What the pipeline needs from one release document.
///
/// Built field by field: the download URL is only extracted once the version
/// turned out to be newer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseMetadata {
    /// Canonical version, without `v` prefix or platform label
    pub version: String,
    /// URL of the first release asset
    pub download_url: String,
}

/// Extract the canonical version string.
///
/// The display name is tried first and used when it contains `v` followed
/// by a digit: everything from that digit on is the version, so
/// `"Linux-v2.3.0"` yields `2.3.0`. Otherwise the tag is used, canonicalized
/// the same way when possible and verbatim when not.
///
/// # Errors
///
/// [`ParseError`] from the tag field when the display name was unusable and
/// the tag is missing or malformed.
///
/// # Examples
///
/// ```rust,no_run
/// use walcman_updater::upgrade::metadata::extract_version;
///
/// assert_eq!(extract_version(r#"{"name":"Linux-v2.3.0"}"#).unwrap(), "2.3.0");
/// assert_eq!(extract_version(r#"{"tag_name":"v1.0.1"}"#).unwrap(), "1.0.1");
/// ```
pub fn extract_version(body: &str) -> Result<String, ParseError> {
    match find_string_field(body, NAME_FIELD, MAX_VERSION_LEN) {
        Ok(label) => match canonical_version(label) {
            Some(version) => return Ok(version.to_string()),
            None => debug!("Display name {label:?} has no version, falling back to tag"),
        },
        Err(e) => debug!("No usable display name ({e}), falling back to tag"),
    }

    let tag = find_string_field(body, TAG_FIELD, MAX_VERSION_LEN)?;
    Ok(canonical_version(tag).unwrap_or(tag).to_string())
}

/// Extract the first asset download URL in document order.
///
/// The URL is returned verbatim; its scheme and shape are not validated.
///
/// # Errors
///
/// [`ParseError`] when the field is missing, not a string, empty or longer
/// than 1024 characters.
pub fn extract_download_url(body: &str) -> Result<String, ParseError> {
    find_string_field(body, DOWNLOAD_URL_FIELD, MAX_URL_LEN).map(str::to_string)
}

/// Everything after the first `v` that is immediately followed by a digit.
fn canonical_version(label: &str) -> Option<&str> {
    label
        .as_bytes()
        .windows(2)
        .position(|pair| pair[0] == b'v' && pair[1].is_ascii_digit())
        .map(|idx| &label[idx + 1..])
}

/// Locate `"<field>": "<value>"` and return the raw value.
///
/// Occurrences of the quoted key that are not followed by `:` (the key text
/// used as a value somewhere) are skipped. The first real key decides: if its
/// value is not a quoted string the field counts as malformed.
fn find_string_field<'a>(
    body: &'a str,
    field: &'static str,
    max_len: usize,
) -> Result<&'a str, ParseError> {
    let marker = format!("\"{field}\"");
    let bytes = body.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = body.get(search_from..).and_then(|rest| rest.find(&marker)) {
        let after_key = search_from + offset + marker.len();
        let pos = skip_whitespace(bytes, after_key);

        if bytes.get(pos) != Some(&b':') {
            search_from = after_key;
            continue;
        }

        let pos = skip_whitespace(bytes, pos + 1);
        if bytes.get(pos) != Some(&b'"') {
            return Err(ParseError::NotAString { field });
        }

        return read_quoted(body, pos + 1, field, max_len);
    }

    Err(ParseError::MissingField { field })
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
        pos += 1;
    }
    pos
}

/// Read from `start` (just past the opening quote) to the closing quote.
///
/// At most `max_len` bytes of value are accepted. Escaped characters are kept
/// as-is; a backslash only prevents the next byte from closing the value.
fn read_quoted<'a>(
    body: &'a str,
    start: usize,
    field: &'static str,
    max_len: usize,
) -> Result<&'a str, ParseError> {
    let bytes = body.as_bytes();
    let limit = start.saturating_add(max_len).min(bytes.len().saturating_sub(1));
    let mut escaped = false;
    let mut pos = start;

    while pos <= limit && pos < bytes.len() {
        match bytes[pos] {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => {
                // `start` follows and `pos` is an ASCII quote, both are char boundaries
                let value = &body[start..pos];
                if value.is_empty() {
                    return Err(ParseError::Empty { field });
                }
                return Ok(value);
            }
            _ => {}
        }
        pos += 1;
    }

    if bytes.len().saturating_sub(start) > max_len {
        Err(ParseError::TooLong {
            field,
            limit: max_len,
        })
    } else {
        Err(ParseError::Unterminated { field })
    }
}
