//! On-chain elections for the QuorumDB state machine.
//!
//! Governance changes (validator rotation and chain migration) are
//! proposed and voted on through ordinary transactions. At every
//! end-of-block the engine scans the block for election activity, tallies
//! votes against the validator set snapshotted at election creation, and
//! concludes any election whose supermajority (> 2/3 of snapshot power)
//! is reached. Conclusions have kind-specific effects and kind-specific
//! rollback hooks for the crash-recovery protocol.

pub mod engine;
pub mod error;

pub use engine::{has_concluded, process_block, rollback};
pub use error::ElectionError;
