//! Byte offset to line/column conversion.

use text_size::TextSize;

/// A 1-based line/column position. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub col: u32,
}

/// Maps byte offsets in a source text to line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the first character of every line.
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Builds the index for a source text.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, byte)| *byte == b'\n')
                .map(|(offset, _)| offset + 1),
        );
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Returns the number of lines (an empty text has one line).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Returns the 1-based line containing `offset`.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> u32 {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        u32::try_from(line + 1).unwrap_or(u32::MAX)
    }

    /// Returns the byte offset where a 1-based line starts.
    #[must_use]
    pub fn line_start(&self, line: u32) -> usize {
        let index = (line.max(1) as usize) - 1;
        self.line_starts.get(index).copied().unwrap_or(self.len)
    }

    /// Converts a byte offset to a 1-based line/column.
    #[must_use]
    pub fn line_col(&self, text: &str, offset: usize) -> LineCol {
        let offset = offset.min(self.len);
        let line = self.line_of(offset);
        let start = self.line_start(line);
        let col = text
            .get(start..offset)
            .map_or(offset - start, |prefix| prefix.chars().count());
        LineCol {
            line,
            col: u32::try_from(col + 1).unwrap_or(u32::MAX),
        }
    }

    /// Converts a [`TextSize`] offset to a 1-based line/column.
    #[must_use]
    pub fn line_col_at(&self, text: &str, offset: TextSize) -> LineCol {
        self.line_col(text, usize::from(offset))
    }
}
