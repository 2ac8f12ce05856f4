//! Line diff between a stored value document and its reconciled form

use similar::{ChangeTag, TextDiff};

use crate::reconcile::Reconciliation;

/// Type of diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    Added,
    Removed,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub line_type: LineType,
    pub content: String,
}

/// Line changes for one value document
#[derive(Debug, Clone, Default)]
pub struct DocumentDiff {
    pub lines: Vec<DiffLine>,
}

impl DocumentDiff {
    /// Diff `old` against `new`, line by line
    pub fn compute(old: &str, new: &str) -> Self {
        let diff = TextDiff::from_lines(old, new);
        let lines = diff
            .iter_all_changes()
            .map(|change| DiffLine {
                line_type: match change.tag() {
                    ChangeTag::Delete => LineType::Removed,
                    ChangeTag::Insert => LineType::Added,
                    ChangeTag::Equal => LineType::Context,
                },
                content: change.value().trim_end_matches('\n').to_string(),
            })
            .collect();

        Self { lines }
    }

    /// What running the upgrade would change on disk
    pub fn of(rec: &Reconciliation) -> Self {
        Self::compute(rec.previous.as_deref().unwrap_or_default(), &rec.rendered)
    }

    pub fn has_changes(&self) -> bool {
        self.lines.iter().any(|line| line.line_type != LineType::Context)
    }

    /// (added, removed) line counts
    pub fn counts(&self) -> (usize, usize) {
        let count = |kind| self.lines.iter().filter(|line| line.line_type == kind).count();
        (count(LineType::Added), count(LineType::Removed))
    }

    /// Unified diff text with `+`, `-` and ` ` prefixes
    pub fn to_unified_diff(&self) -> String {
        let mut output = String::new();

        for line in &self.lines {
            let prefix = match line.line_type {
                LineType::Added => "+",
                LineType::Removed => "-",
                LineType::Context => " ",
            };
            output.push_str(prefix);
            output.push_str(&line.content);
            output.push('\n');
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_diff() {
        let diff = DocumentDiff::compute("a: 1\nb: 2\n", "a: 1\nb: 3\n");

        assert!(diff.has_changes());
        assert_eq!(diff.counts(), (1, 1));
        assert_eq!(diff.to_unified_diff(), " a: 1\n-b: 2\n+b: 3\n");
    }

    #[test]
    fn test_identical_documents() {
        let diff = DocumentDiff::compute("a: 1\n", "a: 1\n");
        assert!(!diff.has_changes());
        assert_eq!(diff.counts(), (0, 0));
    }

    #[test]
    fn test_new_document_is_all_additions() {
        let diff = DocumentDiff::compute("", "a: 1\n");
        assert_eq!(diff.to_unified_diff(), "+a: 1\n");
    }
}
