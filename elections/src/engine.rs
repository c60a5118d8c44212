//! The election engine's block-processing hook and rollback hook.

use crate::ElectionError;
use quorumdb_store::{retry_once, Store};
use quorumdb_types::{
    ChainIdentity, Election, ElectionOperation, PublicKey, Transaction, TxId, ValidatorSet,
    ValidatorUpdate,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Fold a block's election activity into storage and return the aggregate
/// validator-set delta for the consensus engine.
///
/// Scans the block's transactions for election creations and votes, then
/// evaluates every open election. Votes cast in this very block count
/// immediately: they are tallied from the block itself because the
/// transactions are not durable until Commit.
pub fn process_block<S>(
    store: &S,
    height: u64,
    transactions: &[Transaction],
) -> Result<Vec<ValidatorUpdate>, ElectionError>
where
    S: Store + ?Sized,
{
    for tx in transactions {
        if let Some(operation) = tx.election_operation() {
            create_election(store, height, tx.id, operation)?;
        }
    }

    let current_votes = votes_in_block(transactions);
    let empty = BTreeSet::new();

    let mut delta = Vec::new();
    for election in retry_once(|| store.open_elections())? {
        let votes = current_votes.get(&election.id).unwrap_or(&empty);
        if !has_concluded(store, &election, votes)? {
            continue;
        }
        delta.extend(on_approval(store, height, &election)?);
        retry_once(|| {
            store.put_election(&Election {
                height,
                is_concluded: true,
                ..election.clone()
            })
        })?;
        info!(election = %election.id, height, "election concluded");
    }
    Ok(delta)
}

/// Whether an election's supermajority has been reached.
///
/// Voting power is taken from the election's creation snapshot; keys
/// outside the snapshot carry no power, and each voter counts once no
/// matter how many vote transactions it sent. The threshold is strict:
/// exactly two thirds of the power does not conclude. A chain-migration
/// election additionally refuses to conclude while another migration is
/// still awaiting its InitChain continuation.
pub fn has_concluded<S>(
    store: &S,
    election: &Election,
    current_votes: &BTreeSet<PublicKey>,
) -> Result<bool, ElectionError>
where
    S: Store + ?Sized,
{
    if let ElectionOperation::ChainMigration = election.operation {
        if let Some(chain) = retry_once(|| store.latest_chain())? {
            if !chain.is_synced {
                debug!(election = %election.id, "migration already in flight, not concluding");
                return Ok(false);
            }
        }
    }

    let mut voters: BTreeSet<PublicKey> =
        retry_once(|| store.election_votes(&election.id))?.into_iter().collect();
    voters.extend(current_votes.iter().copied());

    let voted: u64 = voters.iter().map(|key| election.voter_power(key)).sum();
    Ok(voted * 3 > election.total_power() * 2)
}

/// Undo the effects of every election the block at `height` touched, then
/// delete all election records written at that height.
///
/// Invoked by the pre-commit recovery protocol when a crash interrupted
/// the block at `height` before its Commit became durable. `txn_ids` are
/// the checkpoint's staged transactions; they are deleted separately by
/// the caller, after this returns.
pub fn rollback<S>(store: &S, height: u64, txn_ids: &[TxId]) -> Result<(), ElectionError>
where
    S: Store + ?Sized,
{
    let mut handled = BTreeSet::new();
    for election in retry_once(|| store.elections_at(height))? {
        if !election.is_concluded {
            continue;
        }
        on_rollback(store, height, &election)?;
        handled.insert(election.id);
        info!(election = %election.id, height, "election conclusion rolled back");
    }

    // An approval's effects and its conclusion record are separate writes,
    // so a crash inside end_block can leave the first without the second.
    // The block's vote transactions name every election that could have
    // concluded; the hooks are no-ops when nothing was staged.
    for id in voted_elections(store, txn_ids)? {
        if handled.contains(&id) {
            continue;
        }
        if let Some(election) = retry_once(|| store.get_election(&id))? {
            on_rollback(store, height, &election)?;
            info!(election = %election.id, height, "staged election effects rolled back");
        }
    }

    // When the vote transactions themselves never became durable, a staged
    // migration is still reachable by key: a chain record at the
    // rolled-back height can only be the unsynced successor written by
    // this block's approval, never an identity a live chain depends on.
    retry_once(|| store.delete_chain(height))?;

    retry_once(|| store.delete_elections(height))?;
    Ok(())
}

fn create_election<S>(
    store: &S,
    height: u64,
    id: TxId,
    operation: ElectionOperation,
) -> Result<(), ElectionError>
where
    S: Store + ?Sized,
{
    if retry_once(|| store.get_election(&id))?.is_some() {
        // Re-delivery of an already-recorded election is a no-op.
        return Ok(());
    }
    let snapshot = retry_once(|| store.validator_set_at(height))?
        .ok_or(ElectionError::MissingValidatorSet(height))?
        .validators;
    retry_once(|| {
        store.put_election(&Election {
            id,
            height,
            operation: operation.clone(),
            is_concluded: false,
            snapshot: snapshot.clone(),
        })
    })?;
    debug!(election = %id, height, "election created");
    Ok(())
}

fn on_approval<S>(
    store: &S,
    height: u64,
    election: &Election,
) -> Result<Vec<ValidatorUpdate>, ElectionError>
where
    S: Store + ?Sized,
{
    match &election.operation {
        ElectionOperation::ValidatorUpdate { updates } => {
            let base = retry_once(|| store.validator_set_at(height))?
                .ok_or(ElectionError::MissingValidatorSet(height))?;
            let next = ValidatorSet {
                height: height + 1,
                validators: base.apply_updates(updates),
            };
            retry_once(|| store.put_validator_set(&next))?;
            info!(
                election = %election.id,
                effective_from = next.height,
                "validator set updated"
            );
            Ok(updates.clone())
        }
        ElectionOperation::ChainMigration => {
            let Some(chain) = retry_once(|| store.latest_chain())? else {
                return Ok(Vec::new());
            };
            let block = retry_once(|| store.latest_block())?.ok_or(ElectionError::NoBlocks)?;
            let successor = ChainIdentity {
                height: block.height + 1,
                chain_id: chain.successor_chain_id(block.height),
                is_synced: false,
            };
            retry_once(|| store.put_chain(&successor))?;
            warn!(
                chain_id = %successor.chain_id,
                "chain migration approved; node halts until the new consensus \
                 engine sends InitChain"
            );
            Ok(Vec::new())
        }
    }
}

fn on_rollback<S>(store: &S, height: u64, election: &Election) -> Result<(), ElectionError>
where
    S: Store + ?Sized,
{
    match &election.operation {
        // The staged set was keyed one past the concluding block.
        ElectionOperation::ValidatorUpdate { .. } => {
            retry_once(|| store.delete_validator_set(height + 1))?;
        }
        // The unsynced successor record was keyed at the concluding block's
        // height (latest block + 1 at approval time).
        ElectionOperation::ChainMigration => {
            retry_once(|| store.delete_chain(height))?;
        }
    }
    Ok(())
}

/// Elections voted on by the given committed transactions. Ids whose
/// transaction is not (or no longer) stored are skipped.
fn voted_elections<S>(store: &S, txn_ids: &[TxId]) -> Result<BTreeSet<TxId>, ElectionError>
where
    S: Store + ?Sized,
{
    let mut elections = BTreeSet::new();
    for txn_id in txn_ids {
        if let Some(tx) = retry_once(|| store.get_transaction(txn_id))? {
            if let Some((election_id, _)) = tx.vote() {
                elections.insert(election_id);
            }
        }
    }
    Ok(elections)
}

fn votes_in_block(transactions: &[Transaction]) -> BTreeMap<TxId, BTreeSet<PublicKey>> {
    let mut votes: BTreeMap<TxId, BTreeSet<PublicKey>> = BTreeMap::new();
    for (election_id, voter) in transactions.iter().filter_map(Transaction::vote) {
        votes.entry(election_id).or_default().insert(voter);
    }
    votes
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorumdb_store::{
        BlockStore, ChainStore, ElectionStore, TransactionStore, ValidatorStore,
    };
    use quorumdb_store_memory::MemoryStore;
    use quorumdb_types::{Block, Operation, Validator};

    fn id(byte: u8) -> TxId {
        TxId::new([byte; 32])
    }

    fn key(byte: u8) -> PublicKey {
        PublicKey::new([byte; 32])
    }

    fn validator(byte: u8, power: u64) -> Validator {
        Validator {
            public_key: key(byte),
            voting_power: power,
        }
    }

    fn vote_tx(tx: u8, election: u8, voter: u8) -> Transaction {
        Transaction {
            id: id(tx),
            operation: Operation::ElectionVote {
                election_id: id(election),
                voter: key(voter),
            },
        }
    }

    /// Genesis-like fixture: validators A=1, B=2, C=3 with 10 power each,
    /// effective from height 1, plus an empty block at height 0.
    fn store_with_genesis() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .put_validator_set(&ValidatorSet {
                height: 1,
                validators: vec![validator(1, 10), validator(2, 10), validator(3, 10)],
            })
            .unwrap();
        store
            .put_block(&Block {
                app_hash: String::new(),
                height: 0,
                transactions: vec![],
            })
            .unwrap();
        store
            .put_chain(&ChainIdentity {
                height: 0,
                chain_id: "quorum-net".into(),
                is_synced: true,
            })
            .unwrap();
        store
    }

    fn replace_a_with_d() -> Transaction {
        Transaction {
            id: id(0x10),
            operation: Operation::ValidatorElection {
                updates: vec![
                    ValidatorUpdate {
                        public_key: key(1),
                        power: 0,
                    },
                    ValidatorUpdate {
                        public_key: key(4),
                        power: 10,
                    },
                ],
            },
        }
    }

    #[test]
    fn creation_snapshots_the_effective_validator_set() {
        let store = store_with_genesis();
        let delta = process_block(&store, 1, &[replace_a_with_d()]).unwrap();
        assert!(delta.is_empty());

        let election = store.get_election(&id(0x10)).unwrap().unwrap();
        assert!(!election.is_concluded);
        assert_eq!(election.total_power(), 30);
    }

    #[test]
    fn exactly_two_thirds_does_not_conclude() {
        let store = store_with_genesis();
        process_block(&store, 1, &[replace_a_with_d()]).unwrap();

        // Two of three voters is 20 of 30 power, exactly two thirds.
        let election = store.get_election(&id(0x10)).unwrap().unwrap();
        let votes: BTreeSet<PublicKey> = [key(2), key(3)].into_iter().collect();
        assert!(!has_concluded(&store, &election, &votes).unwrap());
    }

    #[test]
    fn strictly_more_than_two_thirds_concludes_with_delta() {
        let store = store_with_genesis();
        process_block(&store, 1, &[replace_a_with_d()]).unwrap();

        let delta = process_block(
            &store,
            2,
            &[
                vote_tx(0x21, 0x10, 1),
                vote_tx(0x22, 0x10, 2),
                vote_tx(0x23, 0x10, 3),
            ],
        )
        .unwrap();
        assert_eq!(delta.len(), 2);
        assert!(delta.iter().any(|u| u.public_key == key(1) && u.power == 0));
        assert!(delta.iter().any(|u| u.public_key == key(4) && u.power == 10));

        let staged = store.validator_set_at(3).unwrap().unwrap();
        assert_eq!(staged.height, 3);
        let keys: BTreeSet<PublicKey> =
            staged.validators.iter().map(|v| v.public_key).collect();
        assert_eq!(keys, [key(2), key(3), key(4)].into_iter().collect());

        assert!(store.get_election(&id(0x10)).unwrap().unwrap().is_concluded);
    }

    #[test]
    fn committed_and_current_votes_tally_together() {
        let store = store_with_genesis();
        process_block(&store, 1, &[replace_a_with_d()]).unwrap();

        // One vote committed in an earlier block.
        store.put_transactions(&[vote_tx(0x21, 0x10, 1)]).unwrap();
        // Two more arriving in the current block.
        let delta = process_block(
            &store,
            3,
            &[vote_tx(0x22, 0x10, 2), vote_tx(0x23, 0x10, 3)],
        )
        .unwrap();
        assert_eq!(delta.len(), 2);
    }

    #[test]
    fn duplicate_votes_from_one_voter_count_once() {
        let store = store_with_genesis();
        process_block(&store, 1, &[replace_a_with_d()]).unwrap();

        let delta = process_block(
            &store,
            2,
            &[
                vote_tx(0x21, 0x10, 2),
                vote_tx(0x22, 0x10, 2),
                vote_tx(0x23, 0x10, 2),
            ],
        )
        .unwrap();
        assert!(delta.is_empty());
    }

    #[test]
    fn votes_from_keys_outside_the_snapshot_carry_no_power() {
        let store = store_with_genesis();
        process_block(&store, 1, &[replace_a_with_d()]).unwrap();

        let delta = process_block(
            &store,
            2,
            &[
                vote_tx(0x21, 0x10, 7),
                vote_tx(0x22, 0x10, 8),
                vote_tx(0x23, 0x10, 9),
            ],
        )
        .unwrap();
        assert!(delta.is_empty());
    }

    #[test]
    fn votes_for_a_concluded_election_are_a_noop() {
        let store = store_with_genesis();
        process_block(&store, 1, &[replace_a_with_d()]).unwrap();
        process_block(
            &store,
            2,
            &[
                vote_tx(0x21, 0x10, 1),
                vote_tx(0x22, 0x10, 2),
                vote_tx(0x23, 0x10, 3),
            ],
        )
        .unwrap();

        // A retried vote after conclusion changes nothing.
        let delta = process_block(&store, 3, &[vote_tx(0x31, 0x10, 2)]).unwrap();
        assert!(delta.is_empty());
        let election = store.get_election(&id(0x10)).unwrap().unwrap();
        assert!(election.is_concluded);
        assert_eq!(election.height, 2);
    }

    #[test]
    fn migration_approval_records_unsynced_successor() {
        let store = store_with_genesis();
        let creation = Transaction {
            id: id(0x40),
            operation: Operation::ChainMigrationElection,
        };
        process_block(&store, 1, &[creation]).unwrap();
        store
            .put_block(&Block {
                app_hash: "aa".repeat(32),
                height: 1,
                transactions: vec![id(0x40)],
            })
            .unwrap();
        // At end-of-block for height 2 the latest durable block is 1.
        let delta = process_block(
            &store,
            2,
            &[
                vote_tx(0x41, 0x40, 1),
                vote_tx(0x42, 0x40, 2),
                vote_tx(0x43, 0x40, 3),
            ],
        )
        .unwrap();
        assert!(delta.is_empty());

        let chain = store.latest_chain().unwrap().unwrap();
        assert!(!chain.is_synced);
        assert_eq!(chain.height, 2);
        assert_eq!(chain.chain_id, "quorum-net-migrated-at-height-1");
    }

    #[test]
    fn migration_refuses_to_conclude_while_another_is_in_flight() {
        let store = store_with_genesis();
        store
            .put_chain(&ChainIdentity {
                height: 5,
                chain_id: "quorum-net-migrated-at-height-4".into(),
                is_synced: false,
            })
            .unwrap();

        let creation = Transaction {
            id: id(0x40),
            operation: Operation::ChainMigrationElection,
        };
        process_block(&store, 1, &[creation]).unwrap();
        let delta = process_block(
            &store,
            2,
            &[
                vote_tx(0x41, 0x40, 1),
                vote_tx(0x42, 0x40, 2),
                vote_tx(0x43, 0x40, 3),
            ],
        )
        .unwrap();
        assert!(delta.is_empty());
        assert!(!store.get_election(&id(0x40)).unwrap().unwrap().is_concluded);
    }

    #[test]
    fn rollback_reopens_election_and_deletes_staged_set() {
        let store = store_with_genesis();
        process_block(&store, 1, &[replace_a_with_d()]).unwrap();
        process_block(
            &store,
            2,
            &[
                vote_tx(0x21, 0x10, 1),
                vote_tx(0x22, 0x10, 2),
                vote_tx(0x23, 0x10, 3),
            ],
        )
        .unwrap();
        assert!(store.validator_set_at(3).unwrap().unwrap().height == 3);

        rollback(&store, 2, &[id(0x21), id(0x22), id(0x23)]).unwrap();

        let election = store.get_election(&id(0x10)).unwrap().unwrap();
        assert!(!election.is_concluded);
        // The staged set at height 3 is gone; height 3 resolves back to
        // the genesis set.
        assert_eq!(store.validator_set_at(3).unwrap().unwrap().height, 1);
    }

    #[test]
    fn rollback_deletes_unsynced_migration_record() {
        let store = store_with_genesis();
        let creation = Transaction {
            id: id(0x40),
            operation: Operation::ChainMigrationElection,
        };
        process_block(&store, 1, &[creation]).unwrap();
        store
            .put_block(&Block {
                app_hash: "aa".repeat(32),
                height: 1,
                transactions: vec![id(0x40)],
            })
            .unwrap();
        process_block(
            &store,
            2,
            &[
                vote_tx(0x41, 0x40, 1),
                vote_tx(0x42, 0x40, 2),
                vote_tx(0x43, 0x40, 3),
            ],
        )
        .unwrap();
        assert!(!store.latest_chain().unwrap().unwrap().is_synced);

        rollback(&store, 2, &[id(0x41), id(0x42), id(0x43)]).unwrap();

        // Back to the original synced identity; the migration can be
        // re-attempted cleanly.
        let chain = store.latest_chain().unwrap().unwrap();
        assert!(chain.is_synced);
        assert_eq!(chain.chain_id, "quorum-net");
        assert!(!store.get_election(&id(0x40)).unwrap().unwrap().is_concluded);
    }

    #[test]
    fn rollback_of_creation_height_removes_the_election() {
        let store = store_with_genesis();
        process_block(&store, 1, &[replace_a_with_d()]).unwrap();
        rollback(&store, 1, &[id(0x10)]).unwrap();
        assert_eq!(store.get_election(&id(0x10)).unwrap(), None);
    }

    #[test]
    fn rollback_clears_staged_migration_without_conclusion_record() {
        let store = store_with_genesis();
        let creation = Transaction {
            id: id(0x40),
            operation: Operation::ChainMigrationElection,
        };
        process_block(&store, 1, &[creation]).unwrap();
        store
            .put_block(&Block {
                app_hash: "aa".repeat(32),
                height: 1,
                transactions: vec![id(0x40)],
            })
            .unwrap();
        // Crash inside end_block at height 2: the approval wrote the
        // unsynced successor, but neither the conclusion record nor the
        // vote transactions became durable.
        store
            .put_chain(&ChainIdentity {
                height: 2,
                chain_id: "quorum-net-migrated-at-height-1".into(),
                is_synced: false,
            })
            .unwrap();

        rollback(&store, 2, &[id(0x41), id(0x42), id(0x43)]).unwrap();

        let chain = store.latest_chain().unwrap().unwrap();
        assert!(chain.is_synced);
        assert_eq!(chain.chain_id, "quorum-net");
        // The election is open again and can conclude on the resend.
        assert!(!store.get_election(&id(0x40)).unwrap().unwrap().is_concluded);
    }

    #[test]
    fn rollback_finds_staged_effects_through_committed_votes() {
        let store = store_with_genesis();
        process_block(&store, 1, &[replace_a_with_d()]).unwrap();

        // Crash between the approval's validator-set write and the
        // conclusion record, after the vote transactions became durable.
        store
            .put_transactions(&[
                vote_tx(0x21, 0x10, 1),
                vote_tx(0x22, 0x10, 2),
                vote_tx(0x23, 0x10, 3),
            ])
            .unwrap();
        store
            .put_validator_set(&ValidatorSet {
                height: 3,
                validators: vec![validator(2, 10), validator(3, 10), validator(4, 10)],
            })
            .unwrap();

        rollback(&store, 2, &[id(0x21), id(0x22), id(0x23)]).unwrap();

        // The staged set is gone and the election is still open.
        assert_eq!(store.validator_set_at(3).unwrap().unwrap().height, 1);
        assert!(!store.get_election(&id(0x10)).unwrap().unwrap().is_concluded);
    }
}
