use std::{fmt, ops::RangeInclusive};

/// One end of a historical block range.
///
/// Resolved against the source's latest block when a cursor is opened.
/// There is deliberately no `Pending` marker: logs from pending blocks carry
/// no provenance yet, and the watcher never emits partial records.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockPosition {
    /// The first block the source knows about (block 0).
    Earliest,
    /// The newest mined block at the time the cursor is opened.
    Latest,
    /// An absolute block number.
    Number(u64),
}

impl BlockPosition {
    pub(crate) fn resolve(self, latest: u64) -> u64 {
        match self {
            BlockPosition::Earliest => 0,
            BlockPosition::Latest => latest,
            BlockPosition::Number(number) => number,
        }
    }
}

impl From<u64> for BlockPosition {
    fn from(number: u64) -> Self {
        BlockPosition::Number(number)
    }
}

impl fmt::Display for BlockPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockPosition::Earliest => f.write_str("earliest"),
            BlockPosition::Latest => f.write_str("latest"),
            BlockPosition::Number(number) => write!(f, "{number}"),
        }
    }
}

/// An inclusive historical block range.
///
/// Bounds may be given in either order; the cursor always scans from the
/// lower block to the higher one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockRange {
    pub from: BlockPosition,
    pub to: BlockPosition,
}

impl BlockRange {
    #[must_use]
    pub fn new(from: impl Into<BlockPosition>, to: impl Into<BlockPosition>) -> Self {
        Self { from: from.into(), to: to.into() }
    }

    /// The full chain: earliest through latest.
    #[must_use]
    pub fn all() -> Self {
        Self { from: BlockPosition::Earliest, to: BlockPosition::Latest }
    }
}

impl From<RangeInclusive<u64>> for BlockRange {
    fn from(range: RangeInclusive<u64>) -> Self {
        BlockRange::new(*range.start(), *range.end())
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}
