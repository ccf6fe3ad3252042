//! Ensemble methods module
//!
//! A hard-voting ensemble whose members are a tagged [`Voter`] enum. The
//! vote combinator only sees label vectors, so it is independent of the
//! member types.

mod voting;

pub use voting::{combine_votes, TieBreak, Voter, VotingEnsemble};

use crate::preprocessing::schema::RANDOM_STATE;
use serde::{Deserialize, Serialize};

/// Members and tie rule of the standard ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    pub knn_neighbors: usize,
    pub n_estimators: usize,
    pub include_svm: bool,
    /// Platt-calibrate the SVM so the ensemble reports probabilities
    pub svm_probability: bool,
    pub tie_break: TieBreak,
    pub random_state: u64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            knn_neighbors: 5,
            n_estimators: 100,
            include_svm: false,
            svm_probability: true,
            tie_break: TieBreak::NonFatal,
            random_state: RANDOM_STATE,
        }
    }
}
