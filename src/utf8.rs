//! Byte offset ↔ character index conversion for UTF-8 buffers.
//!
//! Text buffers are mutated by byte offset but reported to the renderer by
//! character index. All helpers here tolerate out-of-range input by clamping
//! to the buffer end, and every byte offset they return sits on a codepoint
//! boundary.
//!
//! # Usage
//!
//! ```rust,ignore
//! use patchedit::utf8;
//!
//! let s = "añb";
//! assert_eq!(utf8::char_to_byte(s, 2), 3);
//! assert_eq!(utf8::byte_to_char(s, 3), 2);
//! ```

/// True when `i` is the start of a codepoint (or the end of the buffer).
pub fn is_boundary(bytes: &[u8], i: usize) -> bool {
    i == 0 || i >= bytes.len() || (bytes[i] & 0xC0) != 0x80
}

/// Number of codepoints in `s`.
pub fn char_count(s: &str) -> usize {
    s.chars().count()
}

/// Character index of byte offset `byte`. Offsets inside a codepoint count
/// that codepoint as not yet reached.
pub fn byte_to_char(s: &str, byte: usize) -> usize {
    let end = byte.min(s.len());
    s.as_bytes()[..end]
        .iter()
        .filter(|&&b| (b & 0xC0) != 0x80)
        .count()
}

/// Byte offset of character index `ch`, clamped to `s.len()`.
pub fn char_to_byte(s: &str, ch: usize) -> usize {
    s.char_indices().nth(ch).map(|(i, _)| i).unwrap_or(s.len())
}

/// Byte offset of the codepoint following the one at `byte`.
pub fn next_boundary(s: &str, byte: usize) -> usize {
    let bytes = s.as_bytes();
    if byte >= bytes.len() {
        return bytes.len();
    }
    let mut i = byte + 1;
    while i < bytes.len() && !is_boundary(bytes, i) {
        i += 1;
    }
    i
}

/// Byte offset of the codepoint preceding `byte`.
pub fn prev_boundary(s: &str, byte: usize) -> usize {
    let bytes = s.as_bytes();
    let mut i = byte.min(bytes.len());
    if i == 0 {
        return 0;
    }
    i -= 1;
    while i > 0 && !is_boundary(bytes, i) {
        i -= 1;
    }
    i
}

/// Round `byte` down to the nearest codepoint boundary.
pub fn floor_boundary(s: &str, byte: usize) -> usize {
    let bytes = s.as_bytes();
    let mut i = byte.min(bytes.len());
    while i > 0 && !is_boundary(bytes, i) {
        i -= 1;
    }
    i
}
