// SPDX-License-Identifier: GPL-3.0-only

//! Decoded text normalization
//!
//! Order matters: the AIM prefix is stripped first, then ASCII control
//! characters are removed, then surrounding whitespace is trimmed.

/// Strip one leading AIM symbology identifier (`]` + 1-2 alphanumerics)
pub fn strip_aim_prefix(text: &str) -> &str {
    let Some(rest) = text.strip_prefix(']') else {
        return text;
    };
    let len = rest
        .bytes()
        .take(2)
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    if len == 0 { text } else { &rest[len..] }
}

/// Normalize raw decoded text
///
/// Idempotent except when the output itself begins with something shaped
/// like an AIM prefix: `" ]C1X"` keeps its prefix on the first pass (the
/// leading space hides it) and loses it on a second pass. Apply this once to
/// raw engine output, not to text that was already normalized.
pub fn normalize(raw: &str) -> String {
    strip_aim_prefix(raw)
        .chars()
        .filter(|c| !c.is_ascii_control())
        .collect::<String>()
        .trim()
        .to_string()
}
