use std::ops;

use lsp_types::Range;

use crate::util::error::RangeError;
use crate::util::position::{PositionEncoding, resolve_offset_with};

/// Resolve an LSP range to the byte span it covers in `text`.
///
/// An inverted range collapses to the empty span at its start.
pub fn resolve_range(
    text: &str,
    range: Range,
    encoding: PositionEncoding,
) -> Result<ops::Range<usize>, RangeError> {
    let start = resolve_offset_with(text, range.start, encoding)?;
    let end = resolve_offset_with(text, range.end, encoding)?;
    Ok(start..end.max(start))
}

/// Replace `range` in `text` with `insert_text`, counting characters in UTF-16.
pub fn apply_change(text: &str, range: Range, insert_text: &str) -> Result<String, RangeError> {
    apply_change_with(text, range, insert_text, PositionEncoding::Utf16)
}

pub fn apply_change_with(
    text: &str,
    range: Range,
    insert_text: &str,
    encoding: PositionEncoding,
) -> Result<String, RangeError> {
    let span = resolve_range(text, range, encoding)?;

    let mut patched = String::with_capacity(text.len() - span.len() + insert_text.len());
    patched.push_str(&text[..span.start]);
    patched.push_str(insert_text);
    patched.push_str(&text[span.end..]);
    Ok(patched)
}

pub fn count_line_breaks(text: &str) -> u32 {
    text.bytes().filter(|&b| b == b'\n').count() as u32
}
