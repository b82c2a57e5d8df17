//! Byte offset to line/column conversion.
//!
//! Columns are counted in UTF-16 code units, which is what editors speak.

use std::sync::Arc;

/// A line index for offset-to-position conversion.
///
/// Building the index is O(n) in the source length; lookups binary search the
/// line table and then walk a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    source: Arc<str>,
    /// Byte offset of the start of each line (line 0 starts at offset 0).
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Build a line index from source text.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );

        Self {
            source: Arc::from(source),
            line_starts,
        }
    }

    /// The indexed source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the number of lines in the source.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset where a line starts.
    #[must_use]
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Text of a line without its terminator.
    #[must_use]
    pub fn line_text(&self, line: usize) -> Option<&str> {
        let start = self.line_start(line)?;
        let end = self
            .line_start(line + 1)
            .map_or(self.source.len(), |next| next - 1);
        let text = self.source.get(start..end)?;
        Some(text.strip_suffix('\r').unwrap_or(text))
    }

    /// Line containing a byte offset.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.source.len());
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        }
    }

    /// Convert a byte offset to a `(line, utf16_column)` position (0-based).
    ///
    /// Offsets past the end clamp to the end of the source. Offsets inside a
    /// multi-byte character clamp to the start of that character.
    #[must_use]
    pub fn offset_to_position(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.source.len());
        let line = self.line_of(offset);
        let line_start = self.line_starts[line];

        let col: usize = self.source[line_start..]
            .char_indices()
            .take_while(|&(i, _)| line_start + i < offset)
            .filter(|&(i, c)| line_start + i + c.len_utf8() <= offset)
            .map(|(_, c)| c.len_utf16())
            .sum();

        (line as u32, col as u32)
    }

    /// Convert a `(line, utf16_column)` position to a byte offset.
    ///
    /// Returns `None` if the line is out of bounds. Columns past the end of
    /// the line clamp to the end of the line.
    #[must_use]
    pub fn position_to_offset(&self, line: u32, col: u32) -> Option<usize> {
        let line = line as usize;
        let start = self.line_start(line)?;
        let text = self.line_text(line)?;

        let mut units = 0usize;
        for (i, c) in text.char_indices() {
            if units >= col as usize {
                return Some(start + i);
            }
            units += c.len_utf16();
        }
        Some(start + text.len())
    }
}
