use std::path::PathBuf;

use similar::{ChangeTag, TextDiff};

/// Line-level difference between two text states of one file. Produced for
/// display, never for storage.
#[derive(Debug, Clone)]
pub struct FileDiff {
    pub path: PathBuf,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    /// Line content without its trailing newline.
    pub content: String,
    pub old_line_number: Option<usize>,
    pub new_line_number: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Context,
    Addition,
    Deletion,
}

impl FileDiff {
    pub fn between(path: impl Into<PathBuf>, old_text: &str, new_text: &str) -> Self {
        let diff = TextDiff::from_lines(old_text, new_text);
        let mut lines = Vec::new();
        let mut old_line_num = 1;
        let mut new_line_num = 1;

        for change in diff.iter_all_changes() {
            let (kind, old_num, new_num) = match change.tag() {
                ChangeTag::Delete => {
                    let num = old_line_num;
                    old_line_num += 1;
                    (DiffLineKind::Deletion, Some(num), None)
                }
                ChangeTag::Insert => {
                    let num = new_line_num;
                    new_line_num += 1;
                    (DiffLineKind::Addition, None, Some(num))
                }
                ChangeTag::Equal => {
                    let old_num = old_line_num;
                    let new_num = new_line_num;
                    old_line_num += 1;
                    new_line_num += 1;
                    (DiffLineKind::Context, Some(old_num), Some(new_num))
                }
            };

            let mut content = change.value().to_string();
            if content.ends_with('\n') {
                content.pop();
                if content.ends_with('\r') {
                    content.pop();
                }
            }

            lines.push(DiffLine {
                kind,
                content,
                old_line_number: old_num,
                new_line_number: new_num,
            });
        }

        FileDiff {
            path: path.into(),
            lines,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.lines
            .iter()
            .any(|line| line.kind != DiffLineKind::Context)
    }

    /// (deletions, additions)
    pub fn change_counts(&self) -> (usize, usize) {
        let deletions = self
            .lines
            .iter()
            .filter(|line| line.kind == DiffLineKind::Deletion)
            .count();
        let additions = self
            .lines
            .iter()
            .filter(|line| line.kind == DiffLineKind::Addition)
            .count();
        (deletions, additions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_diff_detects_changes() {
        let old_text = "line 1\nline 2\nline 3\n";
        let new_text = "line 1\nline 2 modified\nline 3\nline 4\n";

        let diff = FileDiff::between("test.txt", old_text, new_text);

        assert_eq!(diff.path, Path::new("test.txt"));
        assert!(diff.has_changes());
        assert!(diff.lines.iter().any(|l| l.kind == DiffLineKind::Addition));
        assert!(diff.lines.iter().any(|l| l.kind == DiffLineKind::Deletion));
    }

    #[test]
    fn test_identical_content_has_no_changes() {
        let text = "same\neverywhere\n";
        let diff = FileDiff::between("test.txt", text, text);

        assert!(!diff.has_changes());
        assert!(diff.lines.iter().all(|l| l.kind == DiffLineKind::Context));
    }

    #[test]
    fn test_content_carries_no_newline() {
        let diff = FileDiff::between("test.txt", "old\n", "new\r\n");

        for line in &diff.lines {
            assert!(!line.content.ends_with('\n'));
            assert!(!line.content.ends_with('\r'));
        }
    }

    #[test]
    fn test_change_counts() {
        let diff = FileDiff::between("test.txt", "a\nb\nc\n", "a\nB\nc\nd\n");

        let (deletions, additions) = diff.change_counts();
        assert_eq!(deletions, 1);
        assert_eq!(additions, 2);
    }
}
