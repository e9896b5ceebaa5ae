//! Tunable voting parameters.

use serde::{Deserialize, Serialize};

/// Parameters injected into the voting core at construction time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingParams {
    /// Free votes granted to a newly registered user.
    #[serde(default = "default_free_votes")]
    pub default_free_votes: u32,

    /// How many times a refund credit is attempted before the vote unit is
    /// declared lost.
    #[serde(default = "default_credit_retry_attempts")]
    pub credit_retry_attempts: u32,
}

fn default_free_votes() -> u32 {
    3
}

fn default_credit_retry_attempts() -> u32 {
    3
}

impl Default for VotingParams {
    fn default() -> Self {
        Self {
            default_free_votes: default_free_votes(),
            credit_retry_attempts: default_credit_retry_attempts(),
        }
    }
}
