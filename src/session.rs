use lsp_types::{Position, Range, Url};
use tracing::{debug, info, warn};

use crate::sourcemap::directives::DIRECTIVE;
use crate::sourcemap::{LineMaps, parse_directives};
use crate::util::error::RangeError;
use crate::util::position::{PositionEncoding, resolve_offset_with};
use crate::util::text::{apply_change_with, count_line_breaks, resolve_range};

/// How an incremental change was absorbed by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Both documents were patched and the line maps updated in place.
    Incremental,
    /// The change touched source lines with no target counterpart, or spanned
    /// a directive. Only the source was patched; the target must be
    /// regenerated.
    Unmapped,
}

/// One open document: its source text, the generated target text and the
/// line maps between them.
///
/// The session is owned by whoever serializes access to the document; it does
/// no locking of its own.
#[derive(Debug, Clone)]
pub struct DocumentSession {
    uri: Url,
    version: i32,
    encoding: PositionEncoding,
    source_text: String,
    target_text: String,
    maps: LineMaps,
    stale: bool,
}

impl DocumentSession {
    pub fn new(
        uri: Url,
        version: i32,
        encoding: PositionEncoding,
        source_text: String,
        target_text: String,
    ) -> Self {
        let maps = parse_directives(&target_text);
        info!(%uri, version, mapped = maps.source_line_map().len(), "Opened document session");
        Self {
            uri,
            version,
            encoding,
            source_text,
            target_text,
            maps,
            stale: false,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    pub fn encoding(&self) -> PositionEncoding {
        self.encoding
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn target_text(&self) -> &str {
        &self.target_text
    }

    pub fn maps(&self) -> &LineMaps {
        &self.maps
    }

    /// Whether the target no longer reflects the source.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Replace the target with a freshly generated one and rebuild the maps.
    pub fn regenerate(&mut self, target_text: String) {
        self.maps = parse_directives(&target_text);
        self.target_text = target_text;
        self.stale = false;
        debug!(uri = %self.uri, version = self.version, "Regenerated target");
    }

    /// Full-document sync: take the new source, leaving the target stale.
    pub fn replace_source(&mut self, source_text: String) {
        self.source_text = source_text;
        self.stale = true;
    }

    /// Apply one incremental change of the source document.
    ///
    /// The target is patched in place only when the change covers the same
    /// run of lines in both documents. A change that reaches unmapped lines or
    /// crosses a directive patches the source alone and leaves the session
    /// stale. On error neither document is modified.
    pub fn apply_change(&mut self, range: Range, text: &str) -> Result<ChangeOutcome, RangeError> {
        let span = resolve_range(&self.source_text, range, self.encoding)?;
        let deleted_lines = count_line_breaks(&self.source_text[span]);
        let source_text = apply_change_with(&self.source_text, range, text, self.encoding)?;

        let target_range = match self.to_target_range(range) {
            Some(target_range) if !self.stale => target_range,
            _ => {
                warn!(uri = %self.uri, ?range, "Change outside of mapped lines, target needs regeneration");
                return Ok(self.commit_unmapped(source_text));
            }
        };

        let target_span = resolve_range(&self.target_text, target_range, self.encoding)?;
        let target_deleted = count_line_breaks(&self.target_text[target_span]);
        if target_deleted != deleted_lines || spans_directive(&self.target_text, target_range) {
            warn!(
                uri = %self.uri,
                ?range,
                ?target_range,
                deleted_lines,
                target_deleted,
                "Change crosses a directive, target needs regeneration"
            );
            return Ok(self.commit_unmapped(source_text));
        }
        let target_text = apply_change_with(&self.target_text, target_range, text, self.encoding)?;

        self.source_text = source_text;
        self.target_text = target_text;
        self.maps.update(deleted_lines, range.start.line, text);

        debug!(
            ?range,
            ?target_range,
            deleted_lines,
            inserted = text.len(),
            "Applied change"
        );
        Ok(ChangeOutcome::Incremental)
    }

    fn commit_unmapped(&mut self, source_text: String) -> ChangeOutcome {
        self.source_text = source_text;
        self.stale = true;
        ChangeOutcome::Unmapped
    }

    pub fn to_target_position(&self, pos: Position) -> Option<Position> {
        let line = self.maps.target_line(pos.line)?;
        Some(Position::new(line, pos.character))
    }

    pub fn to_source_position(&self, pos: Position) -> Option<Position> {
        let line = self.maps.source_line(pos.line)?;
        Some(Position::new(line, pos.character))
    }

    pub fn to_target_range(&self, range: Range) -> Option<Range> {
        Some(Range::new(
            self.to_target_position(range.start)?,
            self.to_target_position(range.end)?,
        ))
    }

    pub fn to_source_range(&self, range: Range) -> Option<Range> {
        Some(Range::new(
            self.to_source_position(range.start)?,
            self.to_source_position(range.end)?,
        ))
    }

    /// Byte offset in the target text of a source position.
    ///
    /// `None` when the source line has no target counterpart.
    pub fn target_offset(&self, pos: Position) -> Option<Result<usize, RangeError>> {
        let target = self.to_target_position(pos)?;
        Some(resolve_offset_with(&self.target_text, target, self.encoding))
    }
}

/// Whether a directive line lies between the first and last line of `range`.
fn spans_directive(text: &str, range: Range) -> bool {
    let first = range.start.line as usize;
    let last = range.end.line.max(range.start.line) as usize;
    text.split('\n')
        .take(last + 1)
        .skip(first)
        .any(|line| line.starts_with(DIRECTIVE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(source: &str) -> DocumentSession {
        let target = format!("int prelude;\n#line 1\n{source}");
        DocumentSession::new(
            Url::parse("file:///tmp/sketch.ino").unwrap(),
            1,
            PositionEncoding::Utf16,
            source.to_string(),
            target,
        )
    }

    fn range(start: (u32, u32), end: (u32, u32)) -> Range {
        Range::new(Position::new(start.0, start.1), Position::new(end.0, end.1))
    }

    #[test]
    fn translates_positions_both_ways() {
        let session = session("void setup() {\n}\n");
        assert_eq!(
            session.to_target_position(Position::new(1, 0)),
            Some(Position::new(3, 0))
        );
        assert_eq!(
            session.to_source_position(Position::new(2, 5)),
            Some(Position::new(0, 5))
        );
        assert_eq!(session.to_source_position(Position::new(0, 0)), None);
    }

    #[test]
    fn single_line_edit_patches_both_documents() {
        let mut session = session("int a;\nint b;\n");
        let outcome = session.apply_change(range((1, 4), (1, 5)), "bee").unwrap();
        assert_eq!(outcome, ChangeOutcome::Incremental);
        assert_eq!(session.source_text(), "int a;\nint bee;\n");
        assert_eq!(session.target_text(), "int prelude;\n#line 1\nint a;\nint bee;\n");
    }

    #[test]
    fn multi_line_edit_keeps_maps_in_sync() {
        let mut session = session("a\nb\nc\n");
        session.apply_change(range((0, 1), (2, 0)), "X\nY\nZ\n").unwrap();
        assert_eq!(session.source_text(), "aX\nY\nZ\nc\n");
        assert_eq!(session.target_text(), "int prelude;\n#line 1\naX\nY\nZ\nc\n");
        assert_eq!(session.maps(), &parse_directives(session.target_text()));
    }

    #[test]
    fn range_error_leaves_session_untouched() {
        let mut session = session("a\nb");
        let before = session.clone();
        let err = session.apply_change(range((0, 0), (7, 0)), "x").unwrap_err();
        assert_eq!(err, RangeError::line(1, 7));
        assert_eq!(session.source_text(), before.source_text());
        assert_eq!(session.target_text(), before.target_text());
        assert_eq!(session.maps(), before.maps());
    }

    #[test]
    fn unmapped_change_marks_session_stale() {
        let mut session = DocumentSession::new(
            Url::parse("file:///tmp/plain.txt").unwrap(),
            1,
            PositionEncoding::Utf16,
            "a\nb".into(),
            "a\nb".into(),
        );
        let outcome = session.apply_change(range((0, 0), (0, 0)), "x").unwrap();
        assert_eq!(outcome, ChangeOutcome::Unmapped);
        assert!(session.is_stale());
        assert_eq!(session.source_text(), "xa\nb");

        session.regenerate("#line 1\nxa\nb".into());
        assert!(!session.is_stale());
        assert_eq!(
            session.to_target_position(Position::new(1, 0)),
            Some(Position::new(2, 0))
        );
    }

    #[test]
    fn target_offset_resolves_in_target_text() {
        let session = session("foo\nbar");
        // Target: "int prelude;\n#line 1\nfoo\nbar"; "bar" starts at 25.
        assert_eq!(session.target_offset(Position::new(1, 1)), Some(Ok(26)));
        assert_eq!(session.target_offset(Position::new(1, 10)), Some(Ok(28)));
        assert_eq!(session.target_offset(Position::new(9, 0)), None);
    }

    #[test]
    fn joining_lines_across_a_directive_marks_session_stale() {
        let mut session = DocumentSession::new(
            Url::parse("file:///tmp/sketch.ino").unwrap(),
            1,
            PositionEncoding::Utf16,
            "a\nb".into(),
            "#line 1\na\n#line 2\nb".into(),
        );
        let before = session.maps().clone();

        let outcome = session.apply_change(range((0, 1), (1, 0)), "").unwrap();
        assert_eq!(outcome, ChangeOutcome::Unmapped);
        assert!(session.is_stale());
        assert_eq!(session.source_text(), "ab");
        assert_eq!(session.target_text(), "#line 1\na\n#line 2\nb");
        assert_eq!(session.maps(), &before);

        session.regenerate("#line 1\nab".into());
        assert_eq!(session.maps().source_line_map().keys().max(), Some(&2));
        assert_eq!(session.maps().target_line_map().keys().max(), Some(&1));
    }

    #[test]
    fn directive_lines_inside_a_range_are_detected() {
        let text = "int prelude;\n#line 1\na\nb";
        assert!(spans_directive(text, range((0, 0), (2, 0))));
        assert!(spans_directive(text, range((1, 3), (1, 3))));
        assert!(!spans_directive(text, range((2, 0), (3, 1))));
        assert!(!spans_directive(text, range((3, 0), (2, 0))));
    }
}
