//! Validator-set storage trait.

use crate::StoreError;
use quorumdb_types::ValidatorSet;

/// Height-keyed validator-set storage.
pub trait ValidatorStore {
    /// Store a validator set effective from `set.height`. Upserts by
    /// height.
    fn put_validator_set(&self, set: &ValidatorSet) -> Result<(), StoreError>;

    /// The set effective at `height`: the stored record with the greatest
    /// height less than or equal to the requested one.
    fn validator_set_at(&self, height: u64) -> Result<Option<ValidatorSet>, StoreError>;

    /// The stored record with the greatest height, regardless of whether it
    /// is effective yet.
    fn latest_validator_set(&self) -> Result<Option<ValidatorSet>, StoreError>;

    /// Delete the record keyed exactly at `height`. Missing records are a
    /// no-op; used by election rollback.
    fn delete_validator_set(&self, height: u64) -> Result<(), StoreError>;
}
