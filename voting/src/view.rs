//! Read models returned to callers.

use awards_store::{Vote, VoteBalance};
use awards_types::{CategoryId, NomineeId, Timestamp, UserId, VoteId, VoteType};
use serde::Serialize;

/// A vote as reported outward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoteView {
    pub vote_id: VoteId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub nominee_id: NomineeId,
    pub vote_type: VoteType,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Vote> for VoteView {
    fn from(vote: Vote) -> Self {
        Self {
            vote_id: vote.id,
            user_id: vote.user_id,
            category_id: vote.category_id,
            nominee_id: vote.nominee_id,
            vote_type: vote.vote_type,
            created_at: vote.created_at,
            updated_at: vote.updated_at,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AvailableVotes {
    pub free: u32,
    pub paid: u32,
}

impl From<VoteBalance> for AvailableVotes {
    fn from(balance: VoteBalance) -> Self {
        Self {
            free: balance.free,
            paid: balance.paid,
        }
    }
}

/// Tally for one nominee in one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoteCount {
    pub nominee_id: NomineeId,
    pub nominee_name: String,
    pub category_id: CategoryId,
    pub total_votes: u64,
    pub free_votes: u64,
    pub paid_votes: u64,
}

/// What one user has spent in one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserVoteSummary {
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub free_votes_used: u64,
    pub paid_votes_used: u64,
}
