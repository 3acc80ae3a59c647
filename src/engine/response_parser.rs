//! # Response Parser Module
//!
//! Turns a drained [`Completion`] into a [`ResultRecord`].
//!
//! ## Overview
//!
//! A transfer's raw payload is the captured header block immediately followed
//! by the body. The transport reports the header block's byte length in
//! `TransferInfo::header_size`, which is the only thing needed to split the two.
//! The header block is then available for multi-value header extraction, most
//! notably the `Set-Cookie` chain.
//!
//! ## Cookie folding
//!
//! Every `Set-Cookie` line is split on `;` and each token on its first `=`.
//! All tokens of all lines land in one flat map: the cookie pair itself and its
//! attributes (`Path`, `Domain`, `Expires`, ...) share the same namespace, and a
//! later token overwrites an earlier one with the same key. Tokens without `=`
//! (`HttpOnly`, `Secure`) are recorded as [`CookieValue::Flag`].
//!
//! This does not implement RFC 6265 scoping. Two cookies with the same name
//! but different paths or domains collapse into one entry; callers that need
//! per-cookie attributes should parse `ResultRecord::header` themselves.

use crate::response::{Completion, CookieMap, CookieValue, ResultRecord, TransferInfo};
use log::{debug, trace};

const SET_COOKIE_PREFIX: &str = "set-cookie:";

/// Splits `raw` into `(header, body)` at `header_size`.
///
/// A zero length yields an empty header and the whole payload as body. A
/// length past the end of the payload is clamped.
pub fn split_header_body(raw: &[u8], header_size: usize) -> (&[u8], &[u8]) {
    if header_size > raw.len() {
        debug!(
            "Reported header size {} exceeds payload length {}, clamping",
            header_size,
            raw.len()
        );
    }
    raw.split_at(header_size.min(raw.len()))
}

/// Folds every `Set-Cookie` line of a header block into one flat map.
pub fn parse_cookies(header: &[u8]) -> CookieMap {
    let text = String::from_utf8_lossy(header);
    let mut cookies = CookieMap::new();

    for line in text.lines() {
        let Some(rest) = strip_set_cookie(line) else {
            continue;
        };
        trace!("Parsing Set-Cookie line: {}", rest.trim());

        for token in rest.split(';') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match token.split_once('=') {
                Some((name, value)) => {
                    let name = name.trim();
                    if name.is_empty() {
                        debug!("Skipping cookie token without a name: {:?}", token);
                        continue;
                    }
                    cookies.insert(name.to_string(), CookieValue::Value(value.trim().to_string()));
                }
                None => {
                    cookies.insert(token.to_string(), CookieValue::Flag);
                }
            }
        }
    }

    cookies
}

fn strip_set_cookie(line: &str) -> Option<&str> {
    let prefix = line.get(..SET_COOKIE_PREFIX.len())?;
    if prefix.eq_ignore_ascii_case(SET_COOKIE_PREFIX) {
        line.get(SET_COOKIE_PREFIX.len()..)
    } else {
        None
    }
}

/// The redirect target reported by the transport, if any.
pub fn redirect_target(info: &TransferInfo) -> Option<&str> {
    info.redirect_url.as_deref().filter(|url| !url.is_empty())
}

/// Splits a drained completion into its result record.
pub fn parse_completion(completion: Completion) -> ResultRecord {
    let Completion {
        handle,
        url,
        raw,
        error,
        info,
    } = completion;

    let (header, body) = split_header_body(&raw, info.header_size);
    trace!(
        "Split response for {} into {} header bytes and {} body bytes",
        url,
        header.len(),
        body.len()
    );

    ResultRecord {
        handle: Some(handle),
        header: header.to_vec(),
        body: body.to_vec(),
        url,
        error,
        info,
    }
}
