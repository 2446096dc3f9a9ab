//! Line provenance for flattened import output.
//!
//! Import splicing concatenates many files into one buffer. The table maps
//! the 0-based line index in that buffer where each contiguous segment starts
//! to the file the segment came from and the segment's first original line.

use std::collections::BTreeMap;
use std::fmt;

use crate::lexer::count_newlines;

/// Original file and 1-based line number of a flattened position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub file: String,
    pub line: usize,
}

impl Origin {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Segment table keyed by cumulative newline count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvenanceTable {
    segments: BTreeMap<usize, Origin>,
}

impl ProvenanceTable {
    /// A table for a buffer that is entirely `file`, starting at its line 1.
    pub fn new(file: impl Into<String>) -> Self {
        let mut segments = BTreeMap::new();
        segments.insert(0, Origin::new(file, 1));
        Self { segments }
    }

    /// Start a segment at flattened line index `at`.
    pub fn mark(&mut self, at: usize, origin: Origin) {
        self.segments.insert(at, origin);
    }

    /// Insert the segments of a nested buffer spliced at flattened line `at`.
    pub fn splice(&mut self, at: usize, nested: ProvenanceTable) {
        for (line, origin) in nested.segments {
            self.segments.insert(at + line, origin);
        }
    }

    /// Resolve a 0-based flattened line index.
    pub fn locate(&self, flat_line: usize) -> Option<Origin> {
        let (&start, origin) = self.segments.range(..=flat_line).next_back()?;
        Some(Origin::new(origin.file.clone(), origin.line + (flat_line - start)))
    }

    /// Resolve a byte offset into the flattened `text`.
    pub fn locate_offset(&self, text: &str, offset: usize) -> Option<Origin> {
        let offset = offset.min(text.len());
        let before = text.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count();
        self.locate(before)
    }

    /// Resolve a 1-based line number as reported by a downstream engine.
    pub fn locate_line(&self, line: usize) -> Option<Origin> {
        self.locate(line.saturating_sub(1))
    }

    /// Segments as `(flattened line index, origin)` in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Origin)> {
        self.segments.iter().map(|(line, origin)| (*line, origin))
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the table has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Line count contributed by `text` when spliced.
    pub fn lines_in(text: &str) -> usize {
        count_newlines(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_file() {
        let table = ProvenanceTable::new("main.scss");
        assert_eq!(table.locate(0), Some(Origin::new("main.scss", 1)));
        assert_eq!(table.locate(9), Some(Origin::new("main.scss", 10)));
        assert_eq!(table.locate_line(3).unwrap().to_string(), "main.scss:3");
    }

    #[test]
    fn test_splice_and_resume() {
        // main.scss line 3 imports a 4-line partial, then continues.
        let mut table = ProvenanceTable::new("main.scss");
        table.splice(2, ProvenanceTable::new("_var.scss"));
        table.mark(6, Origin::new("main.scss", 3));

        assert_eq!(table.locate(1), Some(Origin::new("main.scss", 2)));
        assert_eq!(table.locate(2), Some(Origin::new("_var.scss", 1)));
        assert_eq!(table.locate(5), Some(Origin::new("_var.scss", 4)));
        assert_eq!(table.locate(6), Some(Origin::new("main.scss", 3)));
        assert_eq!(table.locate(7), Some(Origin::new("main.scss", 4)));
    }

    #[test]
    fn test_keys_strictly_increasing() {
        let mut table = ProvenanceTable::new("a");
        table.mark(5, Origin::new("b", 1));
        table.mark(2, Origin::new("c", 1));
        table.mark(5, Origin::new("a", 3));

        let keys: Vec<_> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![0, 2, 5]);
    }

    #[test]
    fn test_locate_offset() {
        let table = ProvenanceTable::new("main.scss");
        let text = "a\nb\nc";
        assert_eq!(table.locate_offset(text, 4).unwrap().line, 3);
        assert_eq!(table.locate_offset(text, 0).unwrap().line, 1);
    }

    #[test]
    fn test_empty_table_locates_nothing() {
        assert_eq!(ProvenanceTable::default().locate(0), None);
    }
}
