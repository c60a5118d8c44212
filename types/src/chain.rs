//! Chain identity records.
//!
//! A chain migration swaps the consensus engine's genesis while the
//! application's history continues. Each identity records the height
//! *offset* between the engine's local counter (which restarts at zero
//! after a migration) and the application's absolute height. The record
//! with the greatest height is the current identity; `is_synced == false`
//! marks a migration that has not yet received its InitChain continuation.

use serde::{Deserialize, Serialize};

/// Suffix appended to a chain id when a migration is approved.
pub const MIGRATION_SUFFIX: &str = "-migrated-at-height-";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainIdentity {
    /// Offset added to consensus-reported heights to obtain absolute
    /// application heights.
    pub height: u64,
    pub chain_id: String,
    pub is_synced: bool,
}

impl ChainIdentity {
    /// Derive the successor chain id for a migration approved when the
    /// latest block was at `block_height`. Any suffix left by a previous
    /// migration is stripped first, so ids never stack suffixes.
    pub fn successor_chain_id(&self, block_height: u64) -> String {
        let base = self
            .chain_id
            .split(MIGRATION_SUFFIX)
            .next()
            .unwrap_or(&self.chain_id);
        format!("{base}{MIGRATION_SUFFIX}{block_height}")
    }
}
