//! Request and response payloads for the protocol surface.
//!
//! Method names are the contract; the wire encoding belongs to the
//! consensus-engine transport, which is outside this crate. These structs
//! carry exactly the fields the application reads and produces.

use quorumdb_types::{Validator, ValidatorUpdate};
use serde::{Deserialize, Serialize};

/// Consensus-engine protocol versions this application can serve. An Info
/// request reporting any other version is a compatibility failure, not a
/// recoverable error.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["0.34.11", "0.34.24"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoRequest {
    pub protocol_version: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoResponse {
    /// Latest committed height in the consensus engine's local numbering
    /// (absolute height minus the chain-identity offset).
    pub last_block_height: u64,
    /// Latest app hash, empty before the first block.
    pub last_block_app_hash: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisRequest {
    pub chain_id: String,
    pub validators: Vec<Validator>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Height in the consensus engine's local numbering.
    pub height: u64,
    pub num_txs: u64,
}

/// Accept/reject outcome of CheckTx and DeliverTx.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxVerdict {
    Accept,
    Reject,
}

impl TxVerdict {
    /// Wire code: zero accepts, non-zero rejects.
    pub fn code(self) -> u32 {
        match self {
            TxVerdict::Accept => 0,
            TxVerdict::Reject => 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EndBlockResponse {
    pub validator_updates: Vec<ValidatorUpdate>,
}
