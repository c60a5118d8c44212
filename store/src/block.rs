//! Block storage trait.

use crate::StoreError;
use quorumdb_types::Block;

/// Height-keyed block storage.
pub trait BlockStore {
    /// Store a block. Re-storing an identical block at an existing height
    /// is a no-op (consensus engines resend after crash recovery); a
    /// *different* block at an existing height is corruption.
    fn put_block(&self, block: &Block) -> Result<(), StoreError>;

    /// Retrieve the block at a height.
    fn get_block(&self, height: u64) -> Result<Option<Block>, StoreError>;

    /// The block with the greatest height, if any.
    fn latest_block(&self) -> Result<Option<Block>, StoreError>;

    /// Total number of stored blocks.
    fn block_count(&self) -> Result<u64, StoreError>;
}
