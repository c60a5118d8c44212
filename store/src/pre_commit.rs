//! Pre-commit checkpoint storage trait.

use crate::StoreError;
use quorumdb_types::PreCommitState;

/// Storage for the single crash-recovery checkpoint.
///
/// One logical record: `put_pre_commit` overwrites, never appends. Written
/// at every end-of-block, read only at process start.
pub trait PreCommitStore {
    fn put_pre_commit(&self, state: &PreCommitState) -> Result<(), StoreError>;

    fn get_pre_commit(&self) -> Result<Option<PreCommitState>, StoreError>;
}
