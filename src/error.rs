//! Error types surfaced at construction and speculation boundaries.

use thiserror::Error;

/// Errors reported by predictor construction and speculative updates.
///
/// Everything else (tag mismatches, LCVT misses, the absence of any hitting
/// component) is normal control flow and yields defined defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PredictorError {
    /// The folded path is kept in a 32-bit register; an index/tag geometry
    /// wider than 31 bits cannot be represented.
    #[error("index_bits ({index_bits}) + tag_bits ({tag_bits}) must be <= 31")]
    PathTooWide { index_bits: usize, tag_bits: usize },

    /// The outcome window is a fixed-size ring; histories longer than
    /// [`MAX_HIST`](crate::history::MAX_HIST) cannot be reverted correctly.
    #[error("ghist_bits ({ghist_bits}) exceeds the {max}-bit outcome window")]
    HistoryTooLong { ghist_bits: usize, max: usize },

    /// A direct-mapped table must back every index its geometry can form.
    #[error("table of {size} entries cannot back {index_bits} index bits")]
    UndersizedTable { size: usize, index_bits: usize },

    /// Too many in-flight branches; the caller must retire or squash before
    /// announcing more.
    #[error("exceeded maximum speculative branch distance ({0})")]
    SpecOverflow(usize),
}
