//! Domain types for the QuorumDB state machine.
//!
//! Everything the block lifecycle, the election engine, and the storage
//! layer exchange lives here: blocks and their pre-commit checkpoint,
//! validator sets, chain identities, elections, transactions, and the
//! app-hash chain that commits the application state to the consensus
//! engine.

pub mod block;
pub mod chain;
pub mod election;
pub mod hash;
pub mod id;
pub mod transaction;
pub mod validator;

pub use block::{Block, PreCommitState};
pub use chain::ChainIdentity;
pub use election::{Election, ElectionOperation};
pub use hash::{hash_tx_ids, next_app_hash};
pub use id::{IdParseError, PublicKey, TxId};
pub use transaction::{Operation, Transaction};
pub use validator::{total_power, Validator, ValidatorSet, ValidatorUpdate};
