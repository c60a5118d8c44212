//! Pre-commit crash recovery.
//!
//! EndBlock and Commit are not atomic across process crashes. At every
//! start, before any protocol call is accepted, the pre-commit checkpoint
//! is compared against the latest durable block and the interrupted block
//! (if any) is rolled back, so the consensus engine's resend reproduces
//! the exact same app hash.

use crate::error::AppError;
use quorumdb_elections as elections;
use quorumdb_store::{retry_once, Store};
use tracing::{info, warn};

/// What recovery found at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No checkpoint exists: first-ever start.
    NothingToRecover,
    /// The checkpoint's block is durable; the checkpoint is stale.
    AlreadyCommitted,
    /// A commit was interrupted; its staged state was rolled back and the
    /// consensus engine will resend the block at this height.
    RolledBack { height: u64 },
}

/// Run the recovery protocol. Call exactly once, before serving protocol
/// calls.
pub fn rollback_unfinished_block<S>(store: &S) -> Result<RecoveryOutcome, AppError>
where
    S: Store + ?Sized,
{
    let Some(pre_commit) = retry_once(|| store.get_pre_commit())? else {
        return Ok(RecoveryOutcome::NothingToRecover);
    };

    let latest = retry_once(|| store.latest_block())?.ok_or_else(|| {
        AppError::Integrity("pre-commit checkpoint found but no blocks exist".into())
    })?;

    if latest.height == pre_commit.height {
        return Ok(RecoveryOutcome::AlreadyCommitted);
    }
    if pre_commit.height == latest.height + 1 {
        warn!(
            height = pre_commit.height,
            staged_txs = pre_commit.transactions.len(),
            "commit was interrupted, rolling back the staged block"
        );
        elections::rollback(store, pre_commit.height, &pre_commit.transactions)?;
        retry_once(|| store.delete_transactions(&pre_commit.transactions))?;
        info!(height = pre_commit.height, "rollback complete");
        return Ok(RecoveryOutcome::RolledBack {
            height: pre_commit.height,
        });
    }

    // More than one block of drift in either direction cannot arise from a
    // single interrupted commit.
    Err(AppError::Integrity(format!(
        "pre-commit checkpoint at height {} but latest block at height {}",
        pre_commit.height, latest.height
    )))
}
