//! Abstract storage traits for the QuorumDB state machine.
//!
//! Every storage backend implements these traits; the lifecycle, the
//! recovery protocol, and the election engine depend only on them. The
//! backend's query language, indexing, and connection management are its
//! own concern.

pub mod block;
pub mod chain;
pub mod election;
pub mod error;
pub mod pre_commit;
pub mod retry;
pub mod transaction;
pub mod validator;

pub use block::BlockStore;
pub use chain::ChainStore;
pub use election::ElectionStore;
pub use error::StoreError;
pub use pre_commit::PreCommitStore;
pub use retry::retry_once;
pub use transaction::TransactionStore;
pub use validator::ValidatorStore;

/// The full storage contract the state machine requires of its backend.
pub trait Store:
    BlockStore + PreCommitStore + ValidatorStore + ChainStore + TransactionStore + ElectionStore
{
}

impl<T> Store for T where
    T: BlockStore + PreCommitStore + ValidatorStore + ChainStore + TransactionStore + ElectionStore
{
}
