//! Text-or-binary classification and hex rendering for raw store bytes.
//!
//! Every function here is total: a store may hold arbitrary payloads and the
//! viewer only ever inspects them.

use std::borrow::Cow;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Render `bytes` as text when they are printable UTF-8, otherwise as a
/// `[Binary: N bytes]` placeholder.
///
/// Newline, carriage return and tab are allowed; any other control character
/// makes the sequence binary. Valid text is borrowed, not copied.
pub fn classify(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) if is_printable(text) => Cow::Borrowed(text),
        _ => Cow::Owned(binary_placeholder(bytes.len())),
    }
}

/// Check whether `bytes` would be shown as a binary placeholder
pub fn is_binary(bytes: &[u8]) -> bool {
    matches!(classify(bytes), Cow::Owned(_))
}

/// The placeholder shown for non-text byte sequences
pub fn binary_placeholder(len: usize) -> String {
    format!("[Binary: {} bytes]", len)
}

fn is_printable(text: &str) -> bool {
    text.chars()
        .all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
}

/// Render bytes as uppercase hex pairs separated by single spaces ("FF 0A 41")
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().saturating_mul(3));

    for (i, &byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push(HEX_DIGITS[(byte >> 4) as usize] as char);
        out.push(HEX_DIGITS[(byte & 0x0F) as usize] as char);
    }

    out
}

/// Parse the output of [`to_hex`] back into bytes.
///
/// Accepts either case. Returns None for anything that is not a sequence of
/// two-digit hex pairs separated by single spaces.
pub fn parse_hex(text: &str) -> Option<Vec<u8>> {
    if text.is_empty() {
        return Some(Vec::new());
    }

    text.split(' ')
        .map(|pair| {
            if pair.len() != 2 || !pair.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            u8::from_str_radix(pair, 16).ok()
        })
        .collect()
}

/// Format a byte count for status lines ("512 B", "1.5 KiB")
pub fn format_size(len: usize) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if len < 1024 {
        return format!("{} B", len);
    }

    let mut size = len as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", size, UNITS[unit])
}
