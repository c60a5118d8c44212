//! Election records.
//!
//! An election record snapshots a governance proposal's state as of one
//! height. Records are append-only per election and keyed by
//! `(id, height)`: the creation writes the first record, conclusion writes
//! a second one with `is_concluded == true` at the concluding height. The
//! record with the greatest height is the election's current state, and
//! deleting all records at a height (crash rollback) restores whatever
//! state preceded that height.

use crate::id::TxId;
use crate::validator::{total_power, Validator, ValidatorUpdate};
use serde::{Deserialize, Serialize};

/// What an election changes when it concludes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionOperation {
    /// Stage a new validator set effective one block after conclusion.
    ValidatorUpdate { updates: Vec<ValidatorUpdate> },
    /// Replace the chain identity with a fresh consensus genesis.
    ChainMigration,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    /// Id of the transaction that created the election.
    pub id: TxId,
    /// Height this record was written at (creation or conclusion height).
    pub height: u64,
    pub operation: ElectionOperation,
    pub is_concluded: bool,
    /// The validator set effective when the election was created. Votes are
    /// tallied against this snapshot, not against the set at conclusion
    /// time.
    pub snapshot: Vec<Validator>,
}

impl Election {
    /// Total voting power eligible to vote on this election.
    pub fn total_power(&self) -> u64 {
        total_power(&self.snapshot)
    }

    /// Voting power of one key under this election's snapshot. Keys outside
    /// the snapshot carry no power.
    pub fn voter_power(&self, key: &crate::id::PublicKey) -> u64 {
        self.snapshot
            .iter()
            .find(|v| v.public_key == *key)
            .map(|v| v.voting_power)
            .unwrap_or(0)
    }
}
