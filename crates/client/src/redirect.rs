//! Redirect envelope validation and authorization code extraction
//!
//! The redirect URI is the flow's only adversarial input: it arrives from an
//! external agent outside the orchestrator's control and stays untrusted
//! until validated here. Both functions are pure and never panic on
//! malformed input.

use url::Url;

use crate::uri::CALLBACK_HOST;

/// Delimiter carrying the authorization code in the redirect fragment
pub const AUTHORIZATION_CODE_DELIMITER: &str = "#authorization_code=";

/// Check whether a redirect envelope belongs to this flow
///
/// Accepts iff the envelope parses, its scheme equals `expected_scheme`
/// case-insensitively, and its host is exactly the fixed callback host.
/// Anything malformed yields `false`, never an error.
#[must_use]
pub fn accepts(envelope: &str, expected_scheme: &str) -> bool {
    if expected_scheme.is_empty() {
        return false;
    }

    let Ok(url) = Url::parse(envelope) else {
        return false;
    };

    url.scheme().eq_ignore_ascii_case(expected_scheme)
        && url.host_str() == Some(CALLBACK_HOST)
}

/// Extract the single-use authorization code from a validated envelope
///
/// Takes everything after the fixed delimiter and percent-decodes it as
/// UTF-8. Returns `None` when the delimiter is absent, decoding fails, or
/// the decoded code is empty; never yields a partially decoded value.
#[must_use]
pub fn authorization_code(envelope: &str) -> Option<String> {
    let index = envelope.find(AUTHORIZATION_CODE_DELIMITER)?;
    let raw = &envelope[index + AUTHORIZATION_CODE_DELIMITER.len()..];

    // The decoder passes malformed escapes through literally; reject them
    // up front so an undecodable code never surfaces as-is
    if !escapes_well_formed(raw) {
        return None;
    }

    match urlencoding::decode(raw) {
        Ok(decoded) if !decoded.is_empty() => Some(decoded.into_owned()),
        _ => None,
    }
}

/// Check that every `%` in `raw` starts a two-hex-digit escape
fn escapes_well_formed(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len()
                || !bytes[i + 1].is_ascii_hexdigit()
                || !bytes[i + 2].is_ascii_hexdigit()
            {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}
