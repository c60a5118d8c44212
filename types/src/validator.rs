//! Validators, validator sets, and validator-set deltas.

use crate::id::PublicKey;
use serde::{Deserialize, Serialize};

/// A consensus participant: public key plus voting power.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Validator {
    pub public_key: PublicKey,
    pub voting_power: u64,
}

/// The validator set effective *from* `height` onwards.
///
/// Stored idempotently, keyed by height. The set effective at some height H
/// is the stored record with the greatest `height <= H`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSet {
    pub height: u64,
    pub validators: Vec<Validator>,
}

/// A single entry of the validator-set delta returned to the consensus
/// engine at end-of-block. `power == 0` removes the validator; any other
/// value inserts it or replaces its power.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    pub public_key: PublicKey,
    pub power: u64,
}

/// Sum of voting power over a set of validators.
pub fn total_power(validators: &[Validator]) -> u64 {
    validators.iter().map(|v| v.voting_power).sum()
}

impl ValidatorSet {
    /// Apply a delta to this set's validators, producing the successor set's
    /// membership. Removals of unknown keys are ignored.
    pub fn apply_updates(&self, updates: &[ValidatorUpdate]) -> Vec<Validator> {
        let mut validators = self.validators.clone();
        for update in updates {
            validators.retain(|v| v.public_key != update.public_key);
            if update.power > 0 {
                validators.push(Validator {
                    public_key: update.public_key,
                    voting_power: update.power,
                });
            }
        }
        validators
    }
}
