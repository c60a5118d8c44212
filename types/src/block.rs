//! Committed blocks and the pre-commit checkpoint.

use crate::id::TxId;
use serde::{Deserialize, Serialize};

/// A committed block: the application's durable record of one consensus
/// round. Immutable once stored; its presence at a height is the sole
/// "block finalized" signal for that height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// State commitment after this block (lowercase hex, empty before the
    /// first transactions ever committed).
    pub app_hash: String,
    /// Absolute application height.
    pub height: u64,
    /// Ids of the transactions applied in this block, in delivery order.
    pub transactions: Vec<TxId>,
}

/// Crash-recovery checkpoint: the transactions staged for a height whose
/// block is not yet durably stored.
///
/// One logical record, overwritten at every `end_block` and consulted only
/// at process start. Its height is always equal to the latest block's
/// height (stale) or exactly one greater (a commit was in flight).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreCommitState {
    pub height: u64,
    pub transactions: Vec<TxId>,
}
