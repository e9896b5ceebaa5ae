//! Vote storage trait.

use crate::StoreError;
use awards_types::{CategoryId, NomineeId, Timestamp, UserId, VoteId, VoteType};
use serde::{Deserialize, Serialize};

/// A cast vote. `user_id`, `category_id` and `vote_type` never change after
/// insertion; only the nominee can be swapped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub nominee_id: NomineeId,
    pub vote_type: VoteType,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Trait for vote storage.
///
/// Implementations must enforce, atomically with the insert, that at most one
/// `Free` vote exists per `(user, category)`: a second one is rejected with
/// [`StoreError::Duplicate`]. This is the backstop for the unlocked
/// eligibility check.
pub trait VoteStore {
    /// Insert a new vote. `Duplicate` on an id clash or a second free vote
    /// for the same `(user, category)`.
    fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError>;

    fn get_vote(&self, id: &VoteId) -> Result<Vote, StoreError>;

    /// Point a vote at a different nominee and return the updated record.
    fn set_vote_nominee(
        &self,
        id: &VoteId,
        nominee: &NomineeId,
        updated_at: Timestamp,
    ) -> Result<Vote, StoreError>;

    /// Remove a vote and return what was removed. `NotFound` if absent.
    fn delete_vote(&self, id: &VoteId) -> Result<Vote, StoreError>;

    /// The free vote a user holds in a category, if any.
    fn free_vote_for(
        &self,
        user: &UserId,
        category: &CategoryId,
    ) -> Result<Option<VoteId>, StoreError>;

    fn votes_for_user(&self, user: &UserId) -> Result<Vec<Vote>, StoreError>;

    fn votes_for_category(&self, category: &CategoryId) -> Result<Vec<Vote>, StoreError>;

    fn votes_for_nominee(&self, nominee: &NomineeId) -> Result<Vec<Vote>, StoreError>;

    fn iter_votes(&self) -> Result<Vec<Vote>, StoreError>;

    fn vote_count(&self) -> Result<u64, StoreError> {
        self.iter_votes().map(|v| v.len() as u64)
    }
}
