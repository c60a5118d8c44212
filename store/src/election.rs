//! Election-record storage trait.

use crate::StoreError;
use quorumdb_types::{Election, TxId};

/// Append-only election records keyed by `(id, height)`.
///
/// The record with the greatest height is an election's current state;
/// deleting all records written at one height undoes whatever that height
/// did to every election (creation or conclusion).
pub trait ElectionStore {
    /// Store a record. Upserts by `(id, height)`.
    fn put_election(&self, election: &Election) -> Result<(), StoreError>;

    /// The current state of an election: its record with the greatest
    /// height.
    fn get_election(&self, id: &TxId) -> Result<Option<Election>, StoreError>;

    /// Current state of every election that has not concluded.
    fn open_elections(&self) -> Result<Vec<Election>, StoreError>;

    /// Every record written at exactly `height`.
    fn elections_at(&self, height: u64) -> Result<Vec<Election>, StoreError>;

    /// Delete every record written at exactly `height` (crash rollback).
    fn delete_elections(&self, height: u64) -> Result<(), StoreError>;
}
