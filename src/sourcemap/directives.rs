use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::sourcemap::LineMaps;

pub const DIRECTIVE: &str = "#line";

// `#line 12`, `#line 12 "sketch.ino"`
static DIRECTIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#line\s+(\d+)(?:\s|$)").expect("directive pattern is valid")
});

/// Build the line maps of a freshly generated target document.
///
/// A `#line N` directive declares that the next target line is source line `N`
/// (1-based); the lines after it follow contiguously until the next directive.
/// Directive lines themselves are never mapped, and malformed ones leave the
/// running source line untouched. A document without any valid directive has
/// no source correspondence at all and yields empty maps.
pub fn parse_directives(target_text: &str) -> LineMaps {
    let mut maps = LineMaps::new();
    let mut source_line: Option<u32> = None;
    let mut target_line = 0u32;

    for line in target_text.split('\n') {
        if line.starts_with(DIRECTIVE) {
            match parse_directive(line) {
                Some(n) => source_line = Some(n - 1),
                None => trace!(target_line, line, "Ignoring malformed directive"),
            }
        } else if let Some(s) = source_line {
            maps.insert(target_line, s);
            source_line = Some(s + 1);
        }
        target_line += 1;
    }

    if let Some(s) = source_line {
        maps.insert(target_line, s);
    }
    maps
}

/// The 1-based source line of a directive line, if it names a positive one.
fn parse_directive(line: &str) -> Option<u32> {
    let digits = DIRECTIVE_RE.captures(line)?.get(1)?;
    digits.as_str().parse::<u32>().ok().filter(|&n| n > 0)
}
