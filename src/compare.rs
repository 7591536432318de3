//! Line-level comparison of the raw and enhanced prompts.

use similar::{ChangeTag, TextDiff};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Same(String),
    Added(String),
    Removed(String),
}

impl DiffLine {
    pub fn marker(&self) -> char {
        match self {
            DiffLine::Same(_) => ' ',
            DiffLine::Added(_) => '+',
            DiffLine::Removed(_) => '-',
        }
    }

    pub fn text(&self) -> &str {
        match self {
            DiffLine::Same(t) | DiffLine::Added(t) | DiffLine::Removed(t) => t,
        }
    }
}

pub fn line_diff(before: &str, after: &str) -> Vec<DiffLine> {
    // A missing final newline would otherwise make the last line differ
    let before = with_trailing_newline(before);
    let after = with_trailing_newline(after);
    let diff = TextDiff::from_lines(&before, &after);
    diff.iter_all_changes()
        .map(|change| {
            let text = change.value().trim_end_matches(['\r', '\n']).to_string();
            match change.tag() {
                ChangeTag::Equal => DiffLine::Same(text),
                ChangeTag::Insert => DiffLine::Added(text),
                ChangeTag::Delete => DiffLine::Removed(text),
            }
        })
        .collect()
}

fn with_trailing_newline(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{}\n", text)
    }
}

/// (added, removed) line counts
pub fn stats(lines: &[DiffLine]) -> (usize, usize) {
    lines.iter().fold((0, 0), |(added, removed), line| match line {
        DiffLine::Added(_) => (added + 1, removed),
        DiffLine::Removed(_) => (added, removed + 1),
        DiffLine::Same(_) => (added, removed),
    })
}

pub fn render(lines: &[DiffLine]) -> String {
    lines
        .iter()
        .map(|l| format!("{} {}", l.marker(), l.text()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_shows_removed_and_added() {
        let lines = line_diff("write a poem", "<task>\nWrite a poem\n</task>");
        assert_eq!(lines[0], DiffLine::Removed("write a poem".to_string()));
        assert_eq!(stats(&lines), (3, 1));
    }

    #[test]
    fn test_shared_lines_kept() {
        let lines = line_diff("intro\nbody", "intro\nbody\noutro");
        assert_eq!(
            lines,
            vec![
                DiffLine::Same("intro".to_string()),
                DiffLine::Same("body".to_string()),
                DiffLine::Added("outro".to_string()),
            ]
        );
        assert_eq!(render(&lines), "  intro\n  body\n+ outro");
    }

    #[test]
    fn test_identical_is_all_same() {
        let lines = line_diff("a\nb", "a\nb");
        assert_eq!(stats(&lines), (0, 0));
    }
}
