use similar::{ChangeTag, TextDiff};

pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Whitespace-insensitive unified diff renderer
///
/// Two lines are considered equal when they match after every whitespace
/// character is removed, so reflowed indentation and trailing blanks never
/// show up as changes. Hunks are emitted with the original line text; the
/// `---`/`+++` header lines are the caller's responsibility.
#[derive(Debug, Clone)]
pub struct DiffRenderer {
    context_lines: usize,
}

impl DiffRenderer {
    pub fn new() -> Self {
        Self {
            context_lines: DEFAULT_CONTEXT_LINES,
        }
    }

    pub fn with_context(context_lines: usize) -> Self {
        Self { context_lines }
    }

    /// Render unified hunks between two texts; empty when they are equal
    /// ignoring whitespace
    pub fn render(&self, old: &str, new: &str) -> String {
        let old_lines: Vec<&str> = old.lines().collect();
        let new_lines: Vec<&str> = new.lines().collect();

        let old_folded: Vec<String> = old_lines.iter().map(|l| fold_line(l)).collect();
        let new_folded: Vec<String> = new_lines.iter().map(|l| fold_line(l)).collect();
        let old_refs: Vec<&str> = old_folded.iter().map(String::as_str).collect();
        let new_refs: Vec<&str> = new_folded.iter().map(String::as_str).collect();

        let diff = TextDiff::from_slices(&old_refs, &new_refs);

        let mut out = String::new();
        for group in diff.grouped_ops(self.context_lines) {
            let (Some(first), Some(last)) = (group.first(), group.last()) else {
                continue;
            };
            let old_start = first.old_range().start;
            let old_len = last.old_range().end - old_start;
            let new_start = first.new_range().start;
            let new_len = last.new_range().end - new_start;

            out.push_str(&format!(
                "@@ -{},{} +{},{} @@\n",
                hunk_pos(old_start, old_len),
                old_len,
                hunk_pos(new_start, new_len),
                new_len
            ));

            for op in &group {
                for change in diff.iter_changes(op) {
                    match change.tag() {
                        ChangeTag::Equal => {
                            if let Some(i) = change.old_index() {
                                out.push(' ');
                                out.push_str(old_lines[i]);
                                out.push('\n');
                            }
                        }
                        ChangeTag::Delete => {
                            if let Some(i) = change.old_index() {
                                out.push('-');
                                out.push_str(old_lines[i]);
                                out.push('\n');
                            }
                        }
                        ChangeTag::Insert => {
                            if let Some(i) = change.new_index() {
                                out.push('+');
                                out.push_str(new_lines[i]);
                                out.push('\n');
                            }
                        }
                    }
                }
            }
        }

        out
    }
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn fold_line(line: &str) -> String {
    line.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Unified hunk positions are 1-based, except an empty range reports the
/// line before the insertion point
fn hunk_pos(start: usize, len: usize) -> usize {
    if len == 0 {
        start
    } else {
        start + 1
    }
}
