use thiserror::Error;

use crate::{BlockHash, Compact, EntryId};

/// Why a block's proof-of-work was rejected.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum PowError {
    #[error("Compact target {0} has the sign bit set")]
    NegativeTarget(Compact),
    #[error("Compact target {0} does not fit in 256 bits")]
    TargetOverflow(Compact),
    #[error("Compact target {0} decodes to zero")]
    ZeroTarget(Compact),
    #[error("Compact target {0} is easier than the proof-of-work limit")]
    TargetAboveLimit(Compact),
    #[error("Hash {hash} does not match target {bits}")]
    HashAboveTarget { hash: BlockHash, bits: Compact },
}

/// Broken chain-state invariants met while scheduling the next target.
/// None of these are recoverable: they mean the index or the parameters are corrupt.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum RetargetError {
    #[error("Retarget interval at height {0} is zero")]
    ZeroInterval(u64),
    #[error("Retarget window of {interval} blocks reaches below genesis from height {tip_height}")]
    AncestorBelowGenesis { tip_height: u64, interval: u64 },
    #[error("No ancestor at height {height} for tip at height {tip_height}")]
    MissingAncestor { tip_height: u64, height: u64 },
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ChainError {
    #[error("Parent {0} of header is not in the block tree")]
    UnknownParent(BlockHash),
    #[error("Entry {0:?} was not created by this block tree")]
    UnknownEntry(EntryId),
    #[error("Block {0} is already in the block tree")]
    DuplicateBlock(BlockHash),
    #[error("Block tree already has a genesis block")]
    GenesisAlreadySet,
    #[error("Block {hash} declares bits {found}, expected {expected}")]
    BadDifficulty {
        hash: BlockHash,
        expected: Compact,
        found: Compact,
    },
    #[error("Proof-of-work check failed: {0}")]
    ProofOfWork(#[from] PowError),
    #[error("Retarget failed: {0}")]
    Retarget(#[from] RetargetError),
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ParamsError {
    #[error("Proof-of-work limit must be nonzero")]
    ZeroPowLimit,
    #[error("Target spacing must be positive, got {0}")]
    NonPositiveSpacing(i64),
    #[error("Timespan {timespan} is shorter than the target spacing {spacing}")]
    TimespanBelowSpacing { timespan: i64, spacing: i64 },
    #[error("Timespan {timespan} exceeds the maximum of {max}")]
    TimespanTooLong { timespan: i64, max: i64 },
    #[error("Fork timespan schedule must have strictly increasing bounds")]
    UnorderedSchedule,
}
