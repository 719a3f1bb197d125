use std::collections::BTreeMap;

use tracing::{trace, warn};

use crate::sourcemap::LineMaps;
use crate::util::text::count_line_breaks;

impl LineMaps {
    /// Adjust both maps after an edit of the source document.
    ///
    /// `edit_line` is the source line where the edit starts, `deleted_lines` the
    /// number of line breaks removed by it, and `inserted_text` its replacement.
    /// Inserted lines are assumed to map one-to-one onto target lines, which holds
    /// as long as they contain no directive.
    ///
    /// The arguments must describe the edit that was actually applied; anything
    /// else leaves the maps in an unspecified state.
    pub fn update(&mut self, deleted_lines: u32, edit_line: u32, inserted_text: &str) {
        for _ in 0..deleted_lines {
            self.delete_line(edit_line);
        }

        let added_lines = count_line_breaks(inserted_text);
        if added_lines > 0 {
            self.insert_lines(edit_line, added_lines);
        }
    }

    /// Remove the line following `edit_line`, shifting later lines up by one.
    fn delete_line(&mut self, edit_line: u32) {
        let source_line = edit_line + 1;
        let Some(target_line) = self.target_line(source_line) else {
            warn!(source_line, "Deleted line has no target line, skipping");
            return;
        };

        let mut shifted = BTreeMap::new();
        let mut max_source_line = 0u32;
        let mut max_target_line = 0u32;
        for (&t, &s) in &self.source_line_map {
            match (t > target_line, s > source_line) {
                (true, true) => {
                    shifted.insert(t - 1, s - 1);
                }
                (false, true) => {
                    shifted.insert(t, s - 1);
                }
                (true, false) => {
                    shifted.insert(t - 1, s);
                }
                (false, false) => {}
            }
            max_source_line = max_source_line.max(s);
            max_target_line = max_target_line.max(t);
        }

        // The last pair moved up; drop its old slot.
        self.source_line_map.remove(&max_target_line);
        self.target_line_map.remove(&max_source_line);

        trace!(source_line, target_line, shifted = shifted.len(), "Deleted line");
        self.copy_mappings(shifted);
    }

    /// Open `added_lines` lines after `edit_line`, shifting later lines down.
    fn insert_lines(&mut self, edit_line: u32, added_lines: u32) {
        let Some(target_line) = self.target_line(edit_line) else {
            warn!(edit_line, "Insertion line has no target line, skipping");
            return;
        };

        let mut shifted = BTreeMap::new();
        for (&t, &s) in &self.source_line_map {
            match (t > target_line, s > edit_line) {
                (true, true) => {
                    shifted.insert(t + added_lines, s + added_lines);
                }
                (false, true) => {
                    shifted.insert(t, s + added_lines);
                }
                (true, false) => {
                    shifted.insert(t + added_lines, s);
                }
                (false, false) => {}
            }
        }

        for i in 1..=added_lines {
            self.insert(target_line + i, edit_line + i);
        }

        trace!(edit_line, target_line, added_lines, "Inserted lines");
        self.copy_mappings(shifted);
    }

    fn copy_mappings(&mut self, mappings: BTreeMap<u32, u32>) {
        for (&t, &s) in &mappings {
            self.insert(t, s);
        }
        // Several target lines may now claim one source line; keep the last.
        for (&t, &s) in &mappings {
            let target = self.target_line_map.entry(s).or_insert(t);
            if t > *target {
                *target = t;
            }
        }
    }
}
