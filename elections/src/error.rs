use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElectionError {
    #[error("storage error: {0}")]
    Store(#[from] quorumdb_store::StoreError),

    #[error("no validator set effective at height {0}")]
    MissingValidatorSet(u64),

    #[error("migration approved but no block exists to carry over")]
    NoBlocks,
}
