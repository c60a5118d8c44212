//! Transactions as the state-machine core sees them.
//!
//! Ordinary application transactions are opaque: their asset semantics
//! live behind the storage layer and the core only tracks their ids.
//! Governance transactions (election creations and votes) are the one
//! kind the core inspects.

use crate::election::ElectionOperation;
use crate::id::{PublicKey, TxId};
use crate::validator::ValidatorUpdate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub operation: Operation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// An ordinary application transaction. Validated upstream and by the
    /// transaction validator seam; the core never inspects its payload.
    Generic,
    /// Propose a change to the validator set.
    ValidatorElection { updates: Vec<ValidatorUpdate> },
    /// Propose migrating the chain identity to a fresh consensus genesis.
    ChainMigrationElection,
    /// A validator's vote on an open election.
    ElectionVote { election_id: TxId, voter: PublicKey },
}

impl Transaction {
    /// The election this transaction would create, if it is a creation.
    pub fn election_operation(&self) -> Option<ElectionOperation> {
        match &self.operation {
            Operation::ValidatorElection { updates } => {
                Some(ElectionOperation::ValidatorUpdate {
                    updates: updates.clone(),
                })
            }
            Operation::ChainMigrationElection => Some(ElectionOperation::ChainMigration),
            _ => None,
        }
    }

    /// The vote carried by this transaction, if it is a vote.
    pub fn vote(&self) -> Option<(TxId, PublicKey)> {
        match &self.operation {
            Operation::ElectionVote { election_id, voter } => Some((*election_id, *voter)),
            _ => None,
        }
    }
}
