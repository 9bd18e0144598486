//! Line-based delta encoding
//!
//! A version after v1 may be stored as a [`LineDelta`] against the previous
//! version instead of full content. Content is split on `\n` without
//! dropping anything, so joining the lines with `\n` restores the exact
//! bytes (including a trailing newline or its absence).
//!
//! ```
//! use pagevault::delta::{apply_delta, create_delta};
//!
//! let v1 = "Hello\nworld\n";
//! let v2 = "Hello\nthere\nworld\n";
//! let delta = create_delta(1, v1, v2);
//! assert_eq!(apply_delta(v1, &delta).unwrap(), v2);
//! ```
//!
//! The same diff drives version comparison: [`compare_lines`] tags every
//! line as unchanged, added or removed.

mod diff;

pub use diff::{
    apply_chain, apply_delta, compare_lines, create_delta, diff_stats, join_lines, split_lines,
    DeltaError, DeltaOp, DiffLine, DiffStats, LineDelta, LineTag,
};
