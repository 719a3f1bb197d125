use lsp_types::{Position, PositionEncodingKind};

use crate::util::error::RangeError;

/// Unit in which the `character` of an LSP position is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionEncoding {
    Utf8,
    /// The protocol default when nothing was negotiated.
    #[default]
    Utf16,
    Utf32,
}

impl PositionEncoding {
    pub fn from_kind(kind: &PositionEncodingKind) -> Option<Self> {
        if *kind == PositionEncodingKind::UTF8 {
            Some(PositionEncoding::Utf8)
        } else if *kind == PositionEncodingKind::UTF16 {
            Some(PositionEncoding::Utf16)
        } else if *kind == PositionEncodingKind::UTF32 {
            Some(PositionEncoding::Utf32)
        } else {
            None
        }
    }

    pub fn kind(self) -> PositionEncodingKind {
        match self {
            PositionEncoding::Utf8 => PositionEncodingKind::UTF8,
            PositionEncoding::Utf16 => PositionEncodingKind::UTF16,
            PositionEncoding::Utf32 => PositionEncodingKind::UTF32,
        }
    }

    fn unit_len(self, c: char) -> u32 {
        match self {
            PositionEncoding::Utf8 => c.len_utf8() as u32,
            PositionEncoding::Utf16 => c.len_utf16() as u32,
            PositionEncoding::Utf32 => 1,
        }
    }
}

/// Byte offset of the first character of `line`.
///
/// For example:
///    line_start_offset("foo\nfoobar\nbaz", 0) == Ok(0)
///    line_start_offset("foo\nfoobar\nbaz", 1) == Ok(4)
///    line_start_offset("foo\nfoobar\nbaz", 2) == Ok(11)
pub fn line_start_offset(text: &str, line: u32) -> Result<usize, RangeError> {
    if line == 0 {
        return Ok(0);
    }

    let mut breaks = 0u32;
    for (offset, b) in text.bytes().enumerate() {
        if b == b'\n' {
            breaks += 1;
            if breaks == line {
                return Ok(offset + 1);
            }
        }
    }

    Err(RangeError::line(breaks, line))
}

/// Convert an LSP position (UTF-16 characters) to a byte offset in `text`.
pub fn resolve_offset(text: &str, pos: Position) -> Result<usize, RangeError> {
    resolve_offset_with(text, pos, PositionEncoding::Utf16)
}

/// Convert an LSP position to a byte offset, counting characters in `encoding`.
///
/// A character past the end of its line clamps to the line break, and past the
/// end of the last line clamps to the text length. A character that lands inside
/// a multi-unit character cannot be located and is reported as an error.
pub fn resolve_offset_with(
    text: &str,
    pos: Position,
    encoding: PositionEncoding,
) -> Result<usize, RangeError> {
    let line_start = line_start_offset(text, pos.line)?;
    let character = pos.character;
    if character == 0 {
        return Ok(line_start);
    }

    let mut units = 0u32;
    for (offset, c) in text[line_start..].char_indices() {
        if units == character {
            return Ok(line_start + offset);
        }
        if units > character {
            return Err(RangeError::character(units, character));
        }
        if c == '\n' {
            return Ok(line_start + offset);
        }
        units = units.saturating_add(encoding.unit_len(c));
    }

    if units > character {
        return Err(RangeError::character(units, character));
    }
    Ok(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::error::RangeErrorKind;

    #[test]
    fn line_starts() {
        let text = "foo\nfoobar\nbaz";
        assert_eq!(line_start_offset(text, 0), Ok(0));
        assert_eq!(line_start_offset(text, 1), Ok(4));
        assert_eq!(line_start_offset(text, 2), Ok(11));
    }

    #[test]
    fn line_past_last_break() {
        let err = line_start_offset("foo\nfoobar\nbaz", 3).unwrap_err();
        assert_eq!(err.kind, RangeErrorKind::Line);
        assert_eq!(err.max, 2);
        assert_eq!(err.requested, 3);

        // A trailing newline opens one more (empty) line.
        assert_eq!(line_start_offset("foo\n", 1), Ok(4));
        assert_eq!(line_start_offset("", 1), Err(RangeError::line(0, 1)));
    }

    #[test]
    fn origin_is_zero() {
        assert_eq!(resolve_offset("foo", Position::new(0, 0)), Ok(0));
        assert_eq!(resolve_offset("", Position::new(0, 0)), Ok(0));
    }

    #[test]
    fn resolves_inside_line() {
        let text = "foo\nbar\nbaz";
        assert_eq!(resolve_offset(text, Position::new(0, 2)), Ok(2));
        assert_eq!(resolve_offset(text, Position::new(1, 1)), Ok(5));
        assert_eq!(resolve_offset(text, Position::new(2, 3)), Ok(11));
    }

    #[test]
    fn overflow_on_last_line_clamps_to_text_end() {
        assert_eq!(resolve_offset("foo\nbar", Position::new(1, 10)), Ok(7));
    }

    #[test]
    fn overflow_clamps_to_end_of_line() {
        assert_eq!(resolve_offset("foo\nbar\nbaz", Position::new(1, 10)), Ok(7));
        assert_eq!(resolve_offset("foo\nbar\nbaz", Position::new(1, 3)), Ok(7));
    }

    #[test]
    fn line_error_propagates() {
        let err = resolve_offset("foo\nbar", Position::new(5, 1)).unwrap_err();
        assert_eq!(err, RangeError::line(1, 5));
    }

    #[test]
    fn utf16_counts_surrogate_pairs() {
        // The emoji is 4 bytes and 2 UTF-16 units.
        let text = "a😀b";
        assert_eq!(resolve_offset(text, Position::new(0, 1)), Ok(1));
        assert_eq!(resolve_offset(text, Position::new(0, 3)), Ok(5));
        assert_eq!(resolve_offset(text, Position::new(0, 4)), Ok(6));
    }

    #[test]
    fn character_inside_surrogate_pair_is_an_error() {
        let err = resolve_offset("a😀b", Position::new(0, 2)).unwrap_err();
        assert_eq!(err, RangeError::character(3, 2));
    }

    #[test]
    fn utf8_and_utf32_units() {
        let text = "éa\nx";
        assert_eq!(
            resolve_offset_with(text, Position::new(0, 2), PositionEncoding::Utf8),
            Ok(2)
        );
        assert_eq!(
            resolve_offset_with(text, Position::new(0, 1), PositionEncoding::Utf8),
            Err(RangeError::character(2, 1))
        );
        assert_eq!(
            resolve_offset_with(text, Position::new(0, 1), PositionEncoding::Utf32),
            Ok(2)
        );
    }

    #[test]
    fn encoding_kind_round_trip() {
        for encoding in [
            PositionEncoding::Utf8,
            PositionEncoding::Utf16,
            PositionEncoding::Utf32,
        ] {
            assert_eq!(PositionEncoding::from_kind(&encoding.kind()), Some(encoding));
        }
        assert_eq!(
            PositionEncoding::from_kind(&PositionEncodingKind::new("utf-7")),
            None
        );
    }
}
