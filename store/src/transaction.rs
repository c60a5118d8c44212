//! Transaction storage trait.

use crate::StoreError;
use quorumdb_types::{PublicKey, Transaction, TxId};

/// Transaction storage, written in bulk at commit time.
pub trait TransactionStore {
    /// Store a batch of transactions. The whole block's transactions are
    /// written in one call, before the block record itself.
    fn put_transactions(&self, transactions: &[Transaction]) -> Result<(), StoreError>;

    fn get_transaction(&self, id: &TxId) -> Result<Option<Transaction>, StoreError>;

    fn contains_transaction(&self, id: &TxId) -> Result<bool, StoreError>;

    /// Delete a batch of transactions, undoing a partially committed block.
    /// Ids with no stored transaction are ignored.
    fn delete_transactions(&self, ids: &[TxId]) -> Result<(), StoreError>;

    /// Voters of every committed vote transaction for an election. Votes
    /// live in the transaction store, so rolling back a block's
    /// transactions also rolls back its votes.
    fn election_votes(&self, election_id: &TxId) -> Result<Vec<PublicKey>, StoreError>;
}
