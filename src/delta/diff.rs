//! Myers line diff, delta application and diff statistics.

use serde::{Deserialize, Serialize};
use similar::{capture_diff_slices, Algorithm, DiffTag};
use thiserror::Error;

/// Failure applying a delta to a base text
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeltaError {
    /// Delta was computed against a base with a different line count
    #[error("delta expects {expected} base lines, base has {actual}")]
    BaseLineCount { expected: usize, actual: usize },

    /// An op reaches past the end of the base
    #[error("delta op at base line {position} needs {needed} lines, only {available} remain")]
    BaseOverrun {
        position: usize,
        needed: usize,
        available: usize,
    },

    /// Ops finished without consuming the whole base
    #[error("delta consumed {consumed} of {total} base lines")]
    BaseNotConsumed { consumed: usize, total: usize },

    /// A delta in a chain failed
    #[error("failed to apply delta {index} of {total}: {source}")]
    Chain {
        index: usize,
        total: usize,
        #[source]
        source: Box<DeltaError>,
    },
}

/// One edit operation over base lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaOp {
    /// Copy the next n base lines
    Keep(usize),
    /// Skip the next n base lines
    Delete(usize),
    /// Emit these lines
    Insert(Vec<String>),
}

/// A stored delta: the ops that turn `base_version` into the new version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDelta {
    /// Version this delta applies to
    pub base_version: u64,
    /// Number of lines in the base, checked before applying
    pub base_lines: usize,
    /// Edit script
    pub ops: Vec<DeltaOp>,
}

/// Tag of one line in a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTag {
    Unchanged,
    Added,
    Removed,
}

/// One line of a comparison, serialized as `["added", "text"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine(pub LineTag, pub String);

impl DiffLine {
    pub fn tag(&self) -> LineTag {
        self.0
    }

    pub fn text(&self) -> &str {
        &self.1
    }
}

/// Line counts of a comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub additions: usize,
    pub deletions: usize,
    pub unchanged: usize,
}

/// Split content into lines without losing any bytes.
///
/// Empty content has no lines; anything else splits on `\n`, so
/// `"a\n"` is `["a", ""]`.
pub fn split_lines(content: &str) -> Vec<&str> {
    if content.is_empty() {
        Vec::new()
    } else {
        content.split('\n').collect()
    }
}

/// Inverse of [`split_lines`].
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line.as_ref());
    }
    out
}

/// Create a delta turning `old` into `new`.
pub fn create_delta(base_version: u64, old: &str, new: &str) -> LineDelta {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);

    let mut ops: Vec<DeltaOp> = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, &old_lines, &new_lines) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => push_op(&mut ops, DeltaOp::Keep(old_range.len())),
            DiffTag::Delete => push_op(&mut ops, DeltaOp::Delete(old_range.len())),
            DiffTag::Insert => push_op(&mut ops, DeltaOp::Insert(owned(&new_lines[new_range]))),
            DiffTag::Replace => {
                push_op(&mut ops, DeltaOp::Delete(old_range.len()));
                push_op(&mut ops, DeltaOp::Insert(owned(&new_lines[new_range])));
            }
        }
    }

    LineDelta {
        base_version,
        base_lines: old_lines.len(),
        ops,
    }
}

fn owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}

/// Append an op, merging with the previous one when they have the same kind.
fn push_op(ops: &mut Vec<DeltaOp>, op: DeltaOp) {
    let is_noop = match &op {
        DeltaOp::Keep(n) | DeltaOp::Delete(n) => *n == 0,
        DeltaOp::Insert(lines) => lines.is_empty(),
    };
    if is_noop {
        return;
    }

    if let Some(last) = ops.last_mut() {
        match (last, &op) {
            (DeltaOp::Keep(n), DeltaOp::Keep(m)) | (DeltaOp::Delete(n), DeltaOp::Delete(m)) => {
                *n += *m;
                return;
            }
            (DeltaOp::Insert(prev), DeltaOp::Insert(lines)) => {
                prev.extend(lines.iter().cloned());
                return;
            }
            _ => {}
        }
    }

    ops.push(op);
}

/// Apply a delta to the base text it was computed against.
///
/// Fails rather than guessing when the base does not line up with the delta.
pub fn apply_delta(base: &str, delta: &LineDelta) -> Result<String, DeltaError> {
    let base_lines = split_lines(base);
    if base_lines.len() != delta.base_lines {
        return Err(DeltaError::BaseLineCount {
            expected: delta.base_lines,
            actual: base_lines.len(),
        });
    }

    let mut result: Vec<&str> = Vec::with_capacity(base_lines.len());
    let mut position = 0usize;

    for op in &delta.ops {
        match op {
            DeltaOp::Keep(n) | DeltaOp::Delete(n) => {
                let available = base_lines.len() - position;
                if *n > available {
                    return Err(DeltaError::BaseOverrun {
                        position,
                        needed: *n,
                        available,
                    });
                }
                if let DeltaOp::Keep(_) = op {
                    result.extend_from_slice(&base_lines[position..position + n]);
                }
                position += n;
            }
            DeltaOp::Insert(lines) => {
                result.extend(lines.iter().map(String::as_str));
            }
        }
    }

    if position != base_lines.len() {
        return Err(DeltaError::BaseNotConsumed {
            consumed: position,
            total: base_lines.len(),
        });
    }

    Ok(join_lines(&result))
}

/// Apply deltas in order starting from a full snapshot.
pub fn apply_chain(snapshot: &str, deltas: &[LineDelta]) -> Result<String, DeltaError> {
    let total = deltas.len();
    let mut current = snapshot.to_string();

    for (i, delta) in deltas.iter().enumerate() {
        current = apply_delta(&current, delta).map_err(|e| DeltaError::Chain {
            index: i + 1,
            total,
            source: Box::new(e),
        })?;
    }

    Ok(current)
}

/// Tag every line of `old` and `new` as unchanged, removed or added.
pub fn compare_lines(old: &str, new: &str) -> Vec<DiffLine> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    let mut out = Vec::with_capacity(old_lines.len().max(new_lines.len()));

    for op in capture_diff_slices(Algorithm::Myers, &old_lines, &new_lines) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => {
                for line in &old_lines[old_range] {
                    out.push(DiffLine(LineTag::Unchanged, line.to_string()));
                }
            }
            DiffTag::Delete => {
                for line in &old_lines[old_range] {
                    out.push(DiffLine(LineTag::Removed, line.to_string()));
                }
            }
            DiffTag::Insert => {
                for line in &new_lines[new_range] {
                    out.push(DiffLine(LineTag::Added, line.to_string()));
                }
            }
            DiffTag::Replace => {
                for line in &old_lines[old_range] {
                    out.push(DiffLine(LineTag::Removed, line.to_string()));
                }
                for line in &new_lines[new_range] {
                    out.push(DiffLine(LineTag::Added, line.to_string()));
                }
            }
        }
    }

    out
}

/// Count lines per tag.
pub fn diff_stats(diff: &[DiffLine]) -> DiffStats {
    let mut stats = DiffStats::default();
    for line in diff {
        match line.tag() {
            LineTag::Added => stats.additions += 1,
            LineTag::Removed => stats.deletions += 1,
            LineTag::Unchanged => stats.unchanged += 1,
        }
    }
    stats
}
