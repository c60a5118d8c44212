//! The transaction-validation seam.
//!
//! Transaction semantics (assets, ownership, spends) live outside this
//! core; validation is consumed as a pure function over a transaction and
//! the transactions already staged in the current block. CheckTx passes an
//! empty staging slice, DeliverTx passes the block so far: a transaction
//! building on an earlier one in the same block is valid, an intra-block
//! duplicate is not.

use quorumdb_types::{Operation, Transaction};

pub trait TransactionValidator {
    /// Accept or reject `tx` given the transactions already staged in the
    /// current block. Must be side-effect-free: CheckTx calls interleave
    /// with block processing.
    fn validate(&self, tx: &Transaction, staged: &[Transaction]) -> bool;
}

/// Structural validation: enough for the lifecycle and the election
/// subsystem to stay consistent. Deployments with richer transaction
/// models plug in their own implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicValidator;

impl TransactionValidator for BasicValidator {
    fn validate(&self, tx: &Transaction, staged: &[Transaction]) -> bool {
        if tx.id.is_zero() {
            return false;
        }
        if staged.iter().any(|s| s.id == tx.id) {
            return false;
        }
        match &tx.operation {
            Operation::ValidatorElection { updates } => !updates.is_empty(),
            Operation::ElectionVote { election_id, voter } => {
                !election_id.is_zero()
                    && !staged.iter().any(|s| {
                        matches!(
                            &s.operation,
                            Operation::ElectionVote {
                                election_id: staged_election,
                                voter: staged_voter,
                            } if staged_election == election_id && staged_voter == voter
                        )
                    })
            }
            Operation::Generic | Operation::ChainMigrationElection => true,
        }
    }
}
