//! Position translation between commits.
//!
//! Maps positions and ranges from one commit's coordinate space to
//! another's through line-level diff hunks, independent of any bundle.
//! Translation is best-effort: a position whose line was deleted has no
//! mapping, and callers treat that as "skip this candidate", not as an
//! error. When both commits are equal translation is the identity function
//! and no diff is fetched.

use crate::context::QueryContext;
use crate::position::{Position, Range};
use crate::store::CommitDiffSource;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One line run of a diff, zero-based on both sides.
///
/// Pure insertions have `old_lines == 0` and `old_start` indexing the first
/// old line after the insertion point; pure deletions have
/// `new_lines == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
}

/// Translates positions and ranges between commits of one repository.
#[derive(Clone)]
pub struct PositionTranslator {
    diffs: Arc<dyn CommitDiffSource>,
}

impl PositionTranslator {
    pub fn new(diffs: Arc<dyn CommitDiffSource>) -> Self {
        Self { diffs }
    }

    /// Translate `position` from `from_commit` to `to_commit`. Returns
    /// `None` when no mapping exists.
    pub async fn translate_position(
        &self,
        ctx: &QueryContext,
        repository_id: i64,
        from_commit: &str,
        to_commit: &str,
        path: &str,
        position: Position,
    ) -> Result<Option<Position>> {
        if from_commit == to_commit {
            return Ok(Some(position));
        }
        let Some(hunks) = self
            .fetch_hunks(ctx, repository_id, from_commit, to_commit, path)
            .await?
        else {
            return Ok(None);
        };
        Ok(map_position(&hunks, position))
    }

    /// Translate both endpoints of `range`; fails if either endpoint has no
    /// mapping.
    pub async fn translate_range(
        &self,
        ctx: &QueryContext,
        repository_id: i64,
        from_commit: &str,
        to_commit: &str,
        path: &str,
        range: Range,
    ) -> Result<Option<Range>> {
        if from_commit == to_commit {
            return Ok(Some(range));
        }
        let Some(hunks) = self
            .fetch_hunks(ctx, repository_id, from_commit, to_commit, path)
            .await?
        else {
            return Ok(None);
        };
        let (Some(start), Some(end)) = (
            map_position(&hunks, range.start),
            map_position(&hunks, range.end),
        ) else {
            return Ok(None);
        };
        Ok(Some(Range::new(start, end)))
    }

    async fn fetch_hunks(
        &self,
        ctx: &QueryContext,
        repository_id: i64,
        from_commit: &str,
        to_commit: &str,
        path: &str,
    ) -> Result<Option<Vec<DiffHunk>>> {
        ctx.check()?;
        match self
            .diffs
            .hunks(repository_id, from_commit, to_commit, path)
            .await
        {
            Ok(hunks) => Ok(hunks),
            Err(err) => {
                // An unavailable diff eliminates this candidate, not the query.
                tracing::warn!(
                    repository_id,
                    from_commit,
                    to_commit,
                    path,
                    error = %err,
                    "commit diff unavailable, skipping candidate"
                );
                Ok(None)
            }
        }
    }
}

/// Map a position through inserted/deleted/unchanged line runs.
///
/// Lines outside every hunk shift by the cumulative line delta with the
/// character offset preserved. A line inside a changed hunk maps to the
/// start of the corresponding new line, clamped to the hunk's new extent -
/// coarse but never a fabricated in-line offset. A line inside a pure
/// deletion has no mapping.
fn map_position(hunks: &[DiffHunk], position: Position) -> Option<Position> {
    let mut ordered: Vec<&DiffHunk> = hunks.iter().collect();
    ordered.sort_by_key(|hunk| hunk.old_start);

    let mut delta: i64 = 0;
    for hunk in ordered {
        let old_end = hunk.old_start + hunk.old_lines;
        if old_end <= position.line {
            delta += i64::from(hunk.new_lines) - i64::from(hunk.old_lines);
            continue;
        }
        if position.line < hunk.old_start {
            break;
        }
        // Inside the hunk's old extent
        if hunk.new_lines == 0 {
            return None;
        }
        let offset = (position.line - hunk.old_start).min(hunk.new_lines - 1);
        return Some(Position::new(hunk.new_start + offset, 0));
    }

    let line = i64::from(position.line) + delta;
    debug_assert!(line >= 0);
    Some(Position::new(line as u32, position.character))
}
