//! The application side of the consensus protocol.
//!
//! The consensus engine drives [`App`] through the fixed phase sequence
//! Info / InitChain / CheckTx / BeginBlock / DeliverTx / EndBlock / Commit.
//! This crate owns the block lifecycle state machine, the pre-commit crash
//! recovery run at startup, the chain-identity gate that halts processing
//! mid-migration, the transaction-validation seam, and the block-committed
//! event bus.

pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod logging;
pub mod protocol;
pub mod recovery;
pub mod validation;

pub use config::AppConfig;
pub use error::AppError;
pub use events::{Event, EventBus};
pub use lifecycle::App;
pub use logging::{init_logging, LogFormat};
pub use protocol::{
    BlockHeader, EndBlockResponse, GenesisRequest, InfoRequest, InfoResponse, TxVerdict,
    SUPPORTED_PROTOCOL_VERSIONS,
};
pub use recovery::{rollback_unfinished_block, RecoveryOutcome};
pub use validation::{BasicValidator, TransactionValidator};
