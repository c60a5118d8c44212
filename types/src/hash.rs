//! The app-hash chain.
//!
//! After every block the application reports a state commitment (the app
//! hash) to the consensus engine. It is a SHA-256 chain over transaction
//! ids: the ids staged in a block are digested together, then folded with
//! the previous block's app hash. A block with no transactions leaves the
//! app hash unchanged, so empty blocks never move the state commitment.

use crate::id::TxId;
use sha2::{Digest, Sha256};

/// SHA-256 over the concatenation of the given strings, as lowercase hex.
fn hash_strings(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Digest of an ordered sequence of transaction ids.
pub fn hash_tx_ids(ids: &[TxId]) -> String {
    let rendered: Vec<String> = ids.iter().map(TxId::to_string).collect();
    let parts: Vec<&str> = rendered.iter().map(String::as_str).collect();
    hash_strings(&parts)
}

/// The app hash after a block that staged `ids` on top of `previous`.
///
/// `previous` is the empty string before the first block.
pub fn next_app_hash(previous: &str, ids: &[TxId]) -> String {
    if ids.is_empty() {
        return previous.to_owned();
    }
    hash_strings(&[previous, &hash_tx_ids(ids)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> TxId {
        TxId::new([byte; 32])
    }

    #[test]
    fn empty_block_keeps_app_hash() {
        assert_eq!(next_app_hash("cafe", &[]), "cafe");
        assert_eq!(next_app_hash("", &[]), "");
    }

    #[test]
    fn app_hash_is_order_sensitive() {
        let forward = next_app_hash("", &[id(1), id(2)]);
        let reversed = next_app_hash("", &[id(2), id(1)]);
        assert_ne!(forward, reversed);
    }

    #[test]
    fn app_hash_is_hex_of_digest_length() {
        let hash = next_app_hash("", &[id(7)]);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn app_hash_chains_on_previous() {
        let first = next_app_hash("", &[id(1)]);
        let second = next_app_hash(&first, &[id(2)]);
        let second_from_other_parent = next_app_hash("", &[id(2)]);
        assert_ne!(second, second_from_other_parent);
    }
}
