//! Commit diffs from the git CLI.
//!
//! Shells out to `git diff --unified=0` in a locally checked-out working
//! copy and parses the hunk headers into line runs. Zero context lines keep
//! the hunks minimal, which is all position translation needs.

use crate::store::CommitDiffSource;
use crate::translate::DiffHunk;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

/// [`CommitDiffSource`] backed by local git checkouts, one per repository.
#[derive(Debug, Clone, Default)]
pub struct GitCliDiffSource {
    checkouts: HashMap<i64, PathBuf>,
}

impl GitCliDiffSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkout(mut self, repository_id: i64, path: impl Into<PathBuf>) -> Self {
        self.checkouts.insert(repository_id, path.into());
        self
    }
}

#[async_trait]
impl CommitDiffSource for GitCliDiffSource {
    async fn hunks(
        &self,
        repository_id: i64,
        from_commit: &str,
        to_commit: &str,
        path: &str,
    ) -> anyhow::Result<Option<Vec<DiffHunk>>> {
        let Some(dir) = self.checkouts.get(&repository_id) else {
            anyhow::bail!("no checkout configured for repository {repository_id}");
        };
        let output = tokio::process::Command::new("git")
            .args([
                "diff",
                "--unified=0",
                &format!("{from_commit}..{to_commit}"),
                "--",
                path,
            ])
            .current_dir(dir)
            .output()
            .await?;
        if !output.status.success() {
            anyhow::bail!(
                "git diff failed for repository {repository_id}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let text = String::from_utf8_lossy(&output.stdout);
        if text.contains("deleted file mode") {
            return Ok(None);
        }
        Ok(Some(parse_unified_hunks(&text)))
    }
}

/// Parse the `@@ -l,s +l,s @@` headers of a unified diff into zero-based
/// line runs. Non-header lines are ignored.
pub(crate) fn parse_unified_hunks(diff: &str) -> Vec<DiffHunk> {
    let mut hunks = Vec::new();
    for line in diff.lines() {
        let Some(rest) = line.strip_prefix("@@ -") else {
            continue;
        };
        let Some((ranges, _)) = rest.split_once(" @@") else {
            continue;
        };
        let Some((old, new)) = ranges.split_once(" +") else {
            continue;
        };
        let (Some((old_start, old_lines)), Some((new_start, new_lines))) =
            (parse_run(old), parse_run(new))
        else {
            continue;
        };
        hunks.push(DiffHunk {
            old_start,
            old_lines,
            new_start,
            new_lines,
        });
    }
    hunks
}

/// Parse one `line[,count]` run into a zero-based start and length.
///
/// Git's one-based starts shift down by one, except for empty runs where
/// git already anchors at the line before the change and the zero-based
/// anchor is the first line after it.
fn parse_run(run: &str) -> Option<(u32, u32)> {
    let (start, lines) = match run.split_once(',') {
        Some((start, lines)) => (start.parse().ok()?, lines.parse().ok()?),
        None => (run.parse().ok()?, 1),
    };
    if lines == 0 {
        Some((start, 0))
    } else {
        Some((start.saturating_sub(1), lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hunk(old_start: u32, old_lines: u32, new_start: u32, new_lines: u32) -> DiffHunk {
        DiffHunk {
            old_start,
            old_lines,
            new_start,
            new_lines,
        }
    }

    #[test]
    fn test_parse_header_with_counts() {
        let diff = "@@ -3,2 +3,4 @@ func main() {\n-a\n-b\n+c\n+d\n+e\n+f\n";
        assert_eq!(parse_unified_hunks(diff), vec![hunk(2, 2, 2, 4)]);
    }

    #[test]
    fn test_parse_header_without_counts_defaults_to_one_line() {
        let diff = "@@ -7 +9 @@\n-old\n+new\n";
        assert_eq!(parse_unified_hunks(diff), vec![hunk(6, 1, 8, 1)]);
    }

    #[test]
    fn test_parse_pure_insertion() {
        // Three lines inserted after old line 5
        let diff = "@@ -5,0 +6,3 @@\n+x\n+y\n+z\n";
        assert_eq!(parse_unified_hunks(diff), vec![hunk(5, 0, 5, 3)]);
    }

    #[test]
    fn test_parse_pure_deletion() {
        let diff = "@@ -4,2 +3,0 @@\n-x\n-y\n";
        assert_eq!(parse_unified_hunks(diff), vec![hunk(3, 2, 3, 0)]);
    }

    #[test]
    fn test_non_header_lines_are_ignored() {
        let diff = "diff --git a/a.go b/a.go\nindex 123..456 100644\n--- a/a.go\n+++ b/a.go\n@@ -1,1 +1,1 @@\n-a\n+b\n";
        assert_eq!(parse_unified_hunks(diff), vec![hunk(0, 1, 0, 1)]);
    }

    #[test]
    fn test_multiple_hunks() {
        let diff = "@@ -1,1 +1,2 @@\n-a\n+b\n+c\n@@ -10,3 +11,1 @@\n-d\n-e\n-f\n+g\n";
        assert_eq!(
            parse_unified_hunks(diff),
            vec![hunk(0, 1, 0, 2), hunk(9, 3, 10, 1)]
        );
    }
}
