//! The two vote pools a user can spend from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which pool a vote was paid for from. Fixed when the vote is cast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    /// Drawn from the user's free allocation; at most one per category.
    Free,
    /// Drawn from the purchased allocation; uncapped per category.
    Paid,
}

impl VoteType {
    /// Map the caller's "use paid vote" flag to a pool.
    pub fn from_paid_flag(use_paid_vote: bool) -> Self {
        if use_paid_vote {
            Self::Paid
        } else {
            Self::Free
        }
    }

    /// Whether only one vote of this type may exist per (user, category).
    pub fn is_capped_per_category(&self) -> bool {
        matches!(self, Self::Free)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_flag_selects_pool() {
        assert_eq!(VoteType::from_paid_flag(false), VoteType::Free);
        assert_eq!(VoteType::from_paid_flag(true), VoteType::Paid);
    }

    #[test]
    fn only_free_is_capped() {
        assert!(VoteType::Free.is_capped_per_category());
        assert!(!VoteType::Paid.is_capped_per_category());
    }
}
