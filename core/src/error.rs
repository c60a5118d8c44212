use quorumdb_elections::ElectionError;
use quorumdb_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unsupported consensus protocol version {version} (supported: {supported:?})")]
    UnsupportedVersion {
        version: String,
        supported: &'static [&'static str],
    },

    #[error("unexpected InitChain: chain {chain_id} is already synced")]
    ChainAlreadySynced { chain_id: String },

    #[error(
        "chain migration in progress: configure the new consensus engine \
         with chain_id={chain_id} before restarting"
    )]
    MigrationPending { chain_id: String },

    #[error("InitChain genesis disagrees with the migrating chain: {reason}")]
    GenesisMismatch { reason: String },

    #[error("data integrity violation: {0}")]
    Integrity(String),

    #[error("protocol call out of order: {0}")]
    OutOfOrder(&'static str),

    #[error(transparent)]
    Election(#[from] ElectionError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),
}

impl AppError {
    /// Whether this error must terminate the process.
    ///
    /// A replica that keeps running past one of these risks diverging from
    /// the rest of the network, so the daemon exits instead of guessing.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            AppError::Store(StoreError::NotFound(_)) | AppError::Store(StoreError::Duplicate(_))
        )
    }
}
