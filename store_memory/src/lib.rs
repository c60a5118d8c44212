//! In-memory storage backend.
//!
//! Thread-safe maps behind mutexes, implementing every storage trait. This
//! is the backend selected at process start and the test double: it keeps
//! typed values, so nothing is serialized, and every height-indexed query
//! is a `BTreeMap` range scan.

use quorumdb_store::{
    BlockStore, ChainStore, ElectionStore, PreCommitStore, StoreError, TransactionStore,
    ValidatorStore,
};
use quorumdb_types::{
    Block, ChainIdentity, Election, PreCommitState, PublicKey, Transaction, TxId, ValidatorSet,
};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// An in-memory store implementing the full storage contract.
#[derive(Default)]
pub struct MemoryStore {
    blocks: Mutex<BTreeMap<u64, Block>>,
    pre_commit: Mutex<Option<PreCommitState>>,
    validator_sets: Mutex<BTreeMap<u64, ValidatorSet>>,
    chains: Mutex<BTreeMap<u64, ChainIdentity>>,
    transactions: Mutex<BTreeMap<TxId, Transaction>>,
    // Election id -> record height -> record.
    elections: Mutex<BTreeMap<TxId, BTreeMap<u64, Election>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for MemoryStore {
    fn put_block(&self, block: &Block) -> Result<(), StoreError> {
        let mut blocks = self.blocks.lock().unwrap();
        if let Some(existing) = blocks.get(&block.height) {
            if existing == block {
                return Ok(());
            }
            return Err(StoreError::Corruption(format!(
                "conflicting block at height {}",
                block.height
            )));
        }
        blocks.insert(block.height, block.clone());
        Ok(())
    }

    fn get_block(&self, height: u64) -> Result<Option<Block>, StoreError> {
        Ok(self.blocks.lock().unwrap().get(&height).cloned())
    }

    fn latest_block(&self) -> Result<Option<Block>, StoreError> {
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .last_key_value()
            .map(|(_, block)| block.clone()))
    }

    fn block_count(&self) -> Result<u64, StoreError> {
        Ok(self.blocks.lock().unwrap().len() as u64)
    }
}

impl PreCommitStore for MemoryStore {
    fn put_pre_commit(&self, state: &PreCommitState) -> Result<(), StoreError> {
        *self.pre_commit.lock().unwrap() = Some(state.clone());
        Ok(())
    }

    fn get_pre_commit(&self) -> Result<Option<PreCommitState>, StoreError> {
        Ok(self.pre_commit.lock().unwrap().clone())
    }
}

impl ValidatorStore for MemoryStore {
    fn put_validator_set(&self, set: &ValidatorSet) -> Result<(), StoreError> {
        self.validator_sets
            .lock()
            .unwrap()
            .insert(set.height, set.clone());
        Ok(())
    }

    fn validator_set_at(&self, height: u64) -> Result<Option<ValidatorSet>, StoreError> {
        Ok(self
            .validator_sets
            .lock()
            .unwrap()
            .range(..=height)
            .next_back()
            .map(|(_, set)| set.clone()))
    }

    fn latest_validator_set(&self) -> Result<Option<ValidatorSet>, StoreError> {
        Ok(self
            .validator_sets
            .lock()
            .unwrap()
            .last_key_value()
            .map(|(_, set)| set.clone()))
    }

    fn delete_validator_set(&self, height: u64) -> Result<(), StoreError> {
        self.validator_sets.lock().unwrap().remove(&height);
        Ok(())
    }
}

impl ChainStore for MemoryStore {
    fn put_chain(&self, chain: &ChainIdentity) -> Result<(), StoreError> {
        self.chains.lock().unwrap().insert(chain.height, chain.clone());
        Ok(())
    }

    fn latest_chain(&self) -> Result<Option<ChainIdentity>, StoreError> {
        Ok(self
            .chains
            .lock()
            .unwrap()
            .last_key_value()
            .map(|(_, chain)| chain.clone()))
    }

    fn delete_chain(&self, height: u64) -> Result<(), StoreError> {
        self.chains.lock().unwrap().remove(&height);
        Ok(())
    }
}

impl TransactionStore for MemoryStore {
    fn put_transactions(&self, transactions: &[Transaction]) -> Result<(), StoreError> {
        let mut map = self.transactions.lock().unwrap();
        for tx in transactions {
            map.insert(tx.id, tx.clone());
        }
        Ok(())
    }

    fn get_transaction(&self, id: &TxId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.transactions.lock().unwrap().get(id).cloned())
    }

    fn contains_transaction(&self, id: &TxId) -> Result<bool, StoreError> {
        Ok(self.transactions.lock().unwrap().contains_key(id))
    }

    fn delete_transactions(&self, ids: &[TxId]) -> Result<(), StoreError> {
        let mut map = self.transactions.lock().unwrap();
        for id in ids {
            map.remove(id);
        }
        Ok(())
    }

    fn election_votes(&self, election_id: &TxId) -> Result<Vec<PublicKey>, StoreError> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .values()
            .filter_map(Transaction::vote)
            .filter(|(id, _)| id == election_id)
            .map(|(_, voter)| voter)
            .collect())
    }
}

impl ElectionStore for MemoryStore {
    fn put_election(&self, election: &Election) -> Result<(), StoreError> {
        self.elections
            .lock()
            .unwrap()
            .entry(election.id)
            .or_default()
            .insert(election.height, election.clone());
        Ok(())
    }

    fn get_election(&self, id: &TxId) -> Result<Option<Election>, StoreError> {
        Ok(self
            .elections
            .lock()
            .unwrap()
            .get(id)
            .and_then(|records| records.last_key_value())
            .map(|(_, election)| election.clone()))
    }

    fn open_elections(&self) -> Result<Vec<Election>, StoreError> {
        Ok(self
            .elections
            .lock()
            .unwrap()
            .values()
            .filter_map(|records| records.last_key_value())
            .filter(|(_, election)| !election.is_concluded)
            .map(|(_, election)| election.clone())
            .collect())
    }

    fn elections_at(&self, height: u64) -> Result<Vec<Election>, StoreError> {
        Ok(self
            .elections
            .lock()
            .unwrap()
            .values()
            .filter_map(|records| records.get(&height))
            .cloned()
            .collect())
    }

    fn delete_elections(&self, height: u64) -> Result<(), StoreError> {
        let mut elections = self.elections.lock().unwrap();
        for records in elections.values_mut() {
            records.remove(&height);
        }
        elections.retain(|_, records| !records.is_empty());
        Ok(())
    }
}
