//! Line correspondence between a source document and its generated target.

pub mod directives;
pub mod update;

use std::collections::BTreeMap;

pub use directives::parse_directives;

/// The pair of line maps for one document.
///
/// Both maps carry a sentinel pair at one past the last line of each buffer.
/// Lines outside of any `#line`-covered region have no entry. An empty pair
/// means no valid directive was seen, and carries no sentinel either.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineMaps {
    /// Target line → source line.
    source_line_map: BTreeMap<u32, u32>,
    /// Source line → target line. Where several target lines claim the same
    /// source line, the greatest target line is kept.
    target_line_map: BTreeMap<u32, u32>,
}

impl LineMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source line for a target line, if the target line is covered.
    pub fn source_line(&self, target_line: u32) -> Option<u32> {
        self.source_line_map.get(&target_line).copied()
    }

    /// Target line for a source line, if the source line is covered.
    pub fn target_line(&self, source_line: u32) -> Option<u32> {
        self.target_line_map.get(&source_line).copied()
    }

    pub fn source_line_map(&self) -> &BTreeMap<u32, u32> {
        &self.source_line_map
    }

    pub fn target_line_map(&self) -> &BTreeMap<u32, u32> {
        &self.target_line_map
    }

    fn insert(&mut self, target_line: u32, source_line: u32) {
        self.source_line_map.insert(target_line, source_line);
        self.target_line_map.insert(source_line, target_line);
    }
}
