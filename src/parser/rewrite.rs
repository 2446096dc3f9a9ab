//! Byte-range replacements over the expanded source.

/// Replace `text[start..end]` with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Replacement {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Apply non-overlapping `replacements` to `source` in position order.
///
/// A replacement that overlaps an earlier one is skipped.
pub fn apply(source: &str, replacements: &[Replacement]) -> String {
    let mut ordered: Vec<&Replacement> = replacements.iter().collect();
    ordered.sort_by_key(|r| (r.start, r.end));

    let mut out = String::with_capacity(source.len());
    let mut copied = 0;
    for replacement in ordered {
        debug_assert!(replacement.start >= copied, "overlapping replacement {:?}", replacement);
        if replacement.start < copied || replacement.end > source.len() {
            log::warn!(
                "skipping replacement {}..{} (overlaps or out of range)",
                replacement.start,
                replacement.end
            );
            continue;
        }
        out.push_str(&source[copied..replacement.start]);
        out.push_str(&replacement.text);
        copied = replacement.end;
    }
    out.push_str(&source[copied..]);
    out
}
