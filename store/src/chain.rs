//! Chain-identity storage trait.

use crate::StoreError;
use quorumdb_types::ChainIdentity;

/// Height-keyed chain-identity storage. The record with the greatest
/// height is the current identity.
pub trait ChainStore {
    /// Store a chain identity record. Upserts by height: the InitChain
    /// continuation of a migration overwrites the unsynced record with a
    /// synced one at the same height.
    fn put_chain(&self, chain: &ChainIdentity) -> Result<(), StoreError>;

    /// The current chain identity, if any identity was ever recorded.
    fn latest_chain(&self) -> Result<Option<ChainIdentity>, StoreError>;

    /// Delete the record keyed exactly at `height`. Missing records are a
    /// no-op; used by migration rollback.
    fn delete_chain(&self, height: u64) -> Result<(), StoreError>;
}
