// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Percent encoding of facet ids and bin labels.
//!
//! Facet ids and bin labels come from the database and may contain any
//! character, including the grammar's own metacharacters. Every byte is
//! therefore written as a `%XX` escape before it is placed in an expression
//! and decoded again after parsing.

use anyhow::{anyhow, bail, Result};
use data_encoding::HEXUPPER;
use percent_encoding::percent_decode_str;

/// Encodes every byte of `text` as `%XX`.
pub fn hexify(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 3);
    for byte in text.as_bytes() {
        out.push('%');
        out.push_str(&HEXUPPER.encode(&[*byte]));
    }
    out
}

/// Reverses [`hexify`]. Characters outside `%XX` escapes are kept as-is, so
/// text that was never encoded decodes to itself. A `%` that does not start
/// a two digit escape is an error.
pub fn dehexify(text: &str) -> Result<String> {
    if let Some(offset) = malformed_escape(text) {
        bail!("invalid escape at offset {offset} in `{text}`");
    }
    percent_decode_str(text)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| anyhow!("decoded `{text}` is not valid utf-8. {e}"))
}

// Offset of the first `%` not followed by two hex digits.
fn malformed_escape(text: &str) -> Option<usize> {
    text.match_indices('%').map(|(offset, _)| offset).find(|offset| {
        !matches!(
            text.as_bytes().get(offset + 1..offset + 3),
            Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit()
        )
    })
}
