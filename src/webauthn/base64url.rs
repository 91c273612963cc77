//! Base64url codec
//!
//! `WebAuthn` transports every binary field (challenges, credential ids,
//! authenticator data) as unpadded base64url. Browsers and client libraries
//! are not always consistent about padding or alphabet, so decoding is lenient
//! about both while still rejecting anything that is not base64.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Encode bytes as unpadded base64url
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url text
///
/// Accepts the URL-safe and the standard alphabet, with or without `=`
/// padding. Returns `None` when the input contains characters outside both
/// alphabets or has a length no padding can fix.
#[must_use]
pub fn decode(input: &str) -> Option<Vec<u8>> {
    let normalized: String = input
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    URL_SAFE_NO_PAD.decode(normalized).ok()
}
