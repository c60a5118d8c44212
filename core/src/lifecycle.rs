//! The block lifecycle state machine.
//!
//! One [`App`] instance is driven strictly sequentially by the consensus
//! engine: BeginBlock resets the per-block accumulator, DeliverTx fills
//! it, EndBlock writes the pre-commit checkpoint and folds elections, and
//! Commit makes the block durable. No internal locking is needed; CheckTx
//! is side-effect-free and safe to interleave.
//!
//! Fatal conditions are returned as [`AppError`] values rather than
//! exiting here, so they stay testable; the daemon maps
//! [`AppError::is_fatal`] to a process exit.

use crate::error::AppError;
use crate::events::{Event, EventBus};
use crate::protocol::{
    BlockHeader, EndBlockResponse, GenesisRequest, InfoRequest, InfoResponse, TxVerdict,
    SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::validation::TransactionValidator;
use quorumdb_elections as elections;
use quorumdb_store::{retry_once, Store, StoreError};
use quorumdb_types::{next_app_hash, Block, ChainIdentity, PreCommitState, Transaction, TxId,
    Validator, ValidatorSet};
use tracing::{debug, error, info};

/// The application side of the consensus protocol.
pub struct App<S, V> {
    store: S,
    validator: V,
    events: EventBus,
    /// Cached current chain identity; refreshed on InitChain.
    chain: Option<ChainIdentity>,
    /// Ids staged for the block in flight, in delivery order.
    block_txn_ids: Vec<TxId>,
    /// The staged transactions themselves.
    block_transactions: Vec<Transaction>,
    /// App hash computed at EndBlock, returned by Commit.
    block_app_hash: String,
    /// Absolute height of the block in flight, set at EndBlock.
    new_height: Option<u64>,
}

impl<S: Store, V: TransactionValidator> App<S, V> {
    /// Build an application over a storage backend and a validation seam.
    /// Loads the current chain identity; run
    /// [`crate::rollback_unfinished_block`] first.
    pub fn new(store: S, validator: V) -> Result<Self, AppError> {
        let chain = retry_once(|| store.latest_chain())?;
        Ok(Self {
            store,
            validator,
            events: EventBus::new(),
            chain,
            block_txn_ids: Vec::new(),
            block_transactions: Vec::new(),
            block_app_hash: String::new(),
            new_height: None,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the storage backend back, e.g. across a simulated restart.
    pub fn into_store(self) -> S {
        self.store
    }

    /// The event bus; subscribe before handing the app to the transport.
    pub fn events(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Offset between consensus-local heights and absolute heights.
    fn chain_shift(&self) -> u64 {
        self.chain.as_ref().map(|c| c.height).unwrap_or(0)
    }

    /// The chain-sync gate: refuse to process blocks while a migration
    /// awaits its InitChain continuation. The diagnostic carries what the
    /// operator needs to configure the new consensus engine.
    fn ensure_synced(&self) -> Result<(), AppError> {
        let Some(chain) = &self.chain else {
            return Ok(());
        };
        if chain.is_synced {
            return Ok(());
        }
        let validators = retry_once(|| self.store.latest_validator_set())
            .map(|set| set.map(|s| s.validators).unwrap_or_default())
            .unwrap_or_default();
        error!(
            chain_id = %chain.chain_id,
            ?validators,
            "chain migration in progress; download the new consensus engine \
             and configure it with this chain id and validator set"
        );
        Err(AppError::MigrationPending {
            chain_id: chain.chain_id.clone(),
        })
    }

    /// Report the latest committed height and app hash.
    ///
    /// The version gate is a compatibility check: an unsupported protocol
    /// version is fatal, never negotiated down.
    pub fn info(&self, request: &InfoRequest) -> Result<InfoResponse, AppError> {
        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&request.protocol_version.as_str()) {
            return Err(AppError::UnsupportedVersion {
                version: request.protocol_version.clone(),
                supported: SUPPORTED_PROTOCOL_VERSIONS,
            });
        }
        info!(version = %request.protocol_version, "consensus protocol version accepted");

        match retry_once(|| self.store.latest_block())? {
            // While a migration awaits its continuation the identity's
            // offset is one past the latest block; the new consensus
            // engine must see height zero so it sends InitChain.
            Some(block) => Ok(InfoResponse {
                last_block_height: block.height.saturating_sub(self.chain_shift()),
                last_block_app_hash: block.app_hash,
            }),
            None => Ok(InfoResponse {
                last_block_height: 0,
                last_block_app_hash: String::new(),
            }),
        }
    }

    /// Initialize the chain at genesis, or continue a migration.
    ///
    /// A genesis for an already-synced chain, a chain-id mismatch, or a
    /// validator-set mismatch are operator errors: the process must not
    /// guess, so all three are fatal.
    pub fn init_chain(&mut self, genesis: &GenesisRequest) -> Result<(), AppError> {
        let known_chain = retry_once(|| self.store.latest_chain())?;

        let (app_hash, height) = match &known_chain {
            Some(chain) => {
                if chain.is_synced {
                    error!(
                        chain_id = %chain.chain_id,
                        "rejecting InitChain for an already-synced chain"
                    );
                    return Err(AppError::ChainAlreadySynced {
                        chain_id: chain.chain_id.clone(),
                    });
                }
                if chain.chain_id != genesis.chain_id {
                    return Err(AppError::GenesisMismatch {
                        reason: format!(
                            "expected chain_id {}, got {}",
                            chain.chain_id, genesis.chain_id
                        ),
                    });
                }
                // Migration continuation: carry over the latest block.
                match retry_once(|| self.store.latest_block())? {
                    Some(block) => (block.app_hash, block.height + 1),
                    None => (String::new(), 0),
                }
            }
            None => (String::new(), 0),
        };

        if let Some(known) = retry_once(|| self.store.latest_validator_set())? {
            if !known.validators.is_empty()
                && !same_members(&known.validators, &genesis.validators)
            {
                return Err(AppError::GenesisMismatch {
                    reason: format!(
                        "genesis validators {:?} disagree with the stored set {:?}",
                        genesis.validators, known.validators
                    ),
                });
            }
        }

        ignore_duplicate(retry_once(|| {
            self.store.put_block(&Block {
                app_hash: app_hash.clone(),
                height,
                transactions: vec![],
            })
        }))?;
        retry_once(|| {
            self.store.put_validator_set(&ValidatorSet {
                height: height + 1,
                validators: genesis.validators.clone(),
            })
        })?;

        // The offset equals the start block's height: the consensus
        // engine's block 1 then lands exactly one past the carried-over
        // block, keeping absolute heights contiguous and collision-free.
        let chain = ChainIdentity {
            height,
            chain_id: genesis.chain_id.clone(),
            is_synced: true,
        };
        retry_once(|| self.store.put_chain(&chain))?;
        // The superseded unsynced record must not outlive the migration:
        // only one unsynced identity may exist at a time.
        if let Some(known) = &known_chain {
            if known.height != chain.height {
                retry_once(|| self.store.delete_chain(known.height))?;
            }
        }
        info!(
            chain_id = %chain.chain_id,
            offset = chain.height,
            start_height = height,
            "chain initialized"
        );
        self.chain = Some(chain);
        Ok(())
    }

    /// Stateless validation gating mempool entry. No core state changes.
    pub fn check_tx(&self, tx: &Transaction) -> TxVerdict {
        if self.validator.validate(tx, &[]) {
            debug!(tx = %tx.id, "check_tx accepted");
            TxVerdict::Accept
        } else {
            debug!(tx = %tx.id, "check_tx rejected");
            TxVerdict::Reject
        }
    }

    /// Reset the per-block accumulator.
    pub fn begin_block(&mut self, header: &BlockHeader) -> Result<(), AppError> {
        self.ensure_synced()?;
        debug!(
            height = header.height + self.chain_shift(),
            num_txs = header.num_txs,
            "begin block"
        );
        self.block_txn_ids.clear();
        self.block_transactions.clear();
        Ok(())
    }

    /// Validate one final-ordered transaction against the block so far.
    ///
    /// Rejection only reports a non-zero code: the transaction is already
    /// final-ordered, so the block proceeds regardless.
    pub fn deliver_tx(&mut self, tx: Transaction) -> Result<TxVerdict, AppError> {
        self.ensure_synced()?;
        if !self.validator.validate(&tx, &self.block_transactions) {
            debug!(tx = %tx.id, "deliver_tx rejected");
            return Ok(TxVerdict::Reject);
        }
        debug!(tx = %tx.id, "deliver_tx staged");
        self.block_txn_ids.push(tx.id);
        self.block_transactions.push(tx);
        Ok(TxVerdict::Accept)
    }

    /// Write the pre-commit checkpoint, compute the next app hash, and
    /// fold concluded elections into a validator-set delta.
    pub fn end_block(&mut self, height: u64) -> Result<EndBlockResponse, AppError> {
        self.ensure_synced()?;
        let height = height + self.chain_shift();
        self.new_height = Some(height);

        debug!(height, "writing pre-commit checkpoint");
        retry_once(|| {
            self.store.put_pre_commit(&PreCommitState {
                height,
                transactions: self.block_txn_ids.clone(),
            })
        })?;

        let latest = retry_once(|| self.store.latest_block())?.ok_or_else(|| {
            AppError::Integrity("end_block reached with no block in storage".into())
        })?;
        self.block_app_hash = next_app_hash(&latest.app_hash, &self.block_txn_ids);

        let validator_updates =
            elections::process_block(&self.store, height, &self.block_transactions)?;
        Ok(EndBlockResponse { validator_updates })
    }

    /// Make the block durable and return the app hash.
    ///
    /// Transactions are written first; the block record itself must be the
    /// last durable action, because its presence at a height is the
    /// recovery protocol's signal that the block fully completed.
    pub fn commit(&mut self) -> Result<String, AppError> {
        self.ensure_synced()?;
        let height = self
            .new_height
            .ok_or(AppError::OutOfOrder("commit before end_block"))?;

        if !self.block_txn_ids.is_empty() {
            ignore_duplicate(retry_once(|| {
                self.store.put_transactions(&self.block_transactions)
            }))?;
        }
        ignore_duplicate(retry_once(|| {
            self.store.put_block(&Block {
                app_hash: self.block_app_hash.clone(),
                height,
                transactions: self.block_txn_ids.clone(),
            })
        }))?;

        debug!(
            height,
            app_hash = %self.block_app_hash,
            txs = self.block_txn_ids.len(),
            "block committed"
        );
        self.events.emit(&Event::BlockCommitted {
            height,
            transactions: self.block_txn_ids.clone(),
        });
        Ok(self.block_app_hash.clone())
    }
}

/// Re-delivering an already-stored record is benign; anything else
/// propagates.
fn ignore_duplicate(result: Result<(), StoreError>) -> Result<(), StoreError> {
    match result {
        Err(StoreError::Duplicate(key)) => {
            debug!(%key, "record already stored, skipping");
            Ok(())
        }
        other => other,
    }
}

/// Set equality on validator membership, ignoring order.
fn same_members(a: &[Validator], b: &[Validator]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}
