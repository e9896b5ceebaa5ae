//! Eligibility checks for casting and changing votes.
//!
//! Pure reads: nothing here writes to the store. Checks run in a fixed order
//! and the first failure wins.

use std::sync::Arc;

use awards_store::{Category, CategoryStore, NomineeCategoryStore, NomineeStore, VoteStore};
use awards_types::{CategoryId, NomineeId, UserId, VoteType};

use crate::VotingError;

pub struct EligibilityChecker<S> {
    store: Arc<S>,
}

impl<S> EligibilityChecker<S>
where
    S: CategoryStore + NomineeStore + NomineeCategoryStore + VoteStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Everything a new vote must satisfy before any unit is debited:
    /// an active category, an active nominee assigned to it, an open voting
    /// period and, for free votes, no earlier free vote in the category.
    pub fn check_can_cast(
        &self,
        user: &UserId,
        category: &CategoryId,
        nominee: &NomineeId,
        vote_type: VoteType,
    ) -> Result<(), VotingError> {
        let category = self.active_category(category)?;
        self.check_nominee_for_category(nominee, &category.id)?;
        if !self.validate_voting_period(&category) {
            return Err(VotingError::VotingPeriodClosed);
        }
        if !self.can_vote_in_category(user, &category.id, vote_type)? {
            tracing::debug!(%user, category = %category.id, "free vote already used");
            return Err(VotingError::AlreadyVotedWithFreeVote);
        }
        Ok(())
    }

    /// Nominee exists, is active and belongs to `category`.
    pub fn check_nominee_for_category(
        &self,
        nominee: &NomineeId,
        category: &CategoryId,
    ) -> Result<(), VotingError> {
        if !self.store.get_nominee(nominee)?.is_active {
            return Err(VotingError::NomineeNotActive);
        }
        if !self.store.is_assigned(nominee, category)? {
            return Err(VotingError::NomineeNotInCategory);
        }
        Ok(())
    }

    /// Paid votes are never capped per category; a free vote is allowed only
    /// while the user holds none in this category.
    pub fn can_vote_in_category(
        &self,
        user: &UserId,
        category: &CategoryId,
        vote_type: VoteType,
    ) -> Result<bool, VotingError> {
        if !vote_type.is_capped_per_category() {
            return Ok(true);
        }
        Ok(self.store.free_vote_for(user, category)?.is_none())
    }

    /// Categories carry no schedule, so the period is open exactly while the
    /// category is active.
    pub fn validate_voting_period(&self, category: &Category) -> bool {
        category.is_active
    }

    fn active_category(&self, id: &CategoryId) -> Result<Category, VotingError> {
        let category = self.store.get_category(id)?;
        if !category.is_active {
            return Err(VotingError::CategoryNotActive);
        }
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awards_nullables::NullStore;
    use awards_store::{Nominee, Vote};
    use awards_types::{Timestamp, VoteId};

    const USER: UserId = UserId::from_u128(1);
    const CATEGORY: CategoryId = CategoryId::from_u128(10);
    const NOMINEE: NomineeId = NomineeId::from_u128(100);

    fn setup(category_active: bool, nominee_active: bool, assigned: bool) -> Arc<NullStore> {
        let store = Arc::new(NullStore::new());
        store
            .put_category(&Category {
                id: CATEGORY,
                name: "Best Album".into(),
                description: String::new(),
                is_active: category_active,
                created_at: Timestamp::new(1),
            })
            .unwrap();
        store
            .put_nominee(&Nominee {
                id: NOMINEE,
                name: "Artist".into(),
                description: String::new(),
                is_active: nominee_active,
                created_at: Timestamp::new(1),
            })
            .unwrap();
        if assigned {
            store.assign(&NOMINEE, &CATEGORY).unwrap();
        }
        store
    }

    #[test]
    fn all_checks_pass() {
        let checker = EligibilityChecker::new(setup(true, true, true));
        checker
            .check_can_cast(&USER, &CATEGORY, &NOMINEE, VoteType::Free)
            .unwrap();
    }

    #[test]
    fn inactive_category_checked_first() {
        // Nominee is also inactive and unassigned; the category error wins.
        let checker = EligibilityChecker::new(setup(false, false, false));
        assert!(matches!(
            checker.check_can_cast(&USER, &CATEGORY, &NOMINEE, VoteType::Paid),
            Err(VotingError::CategoryNotActive)
        ));
    }

    #[test]
    fn inactive_nominee_before_membership() {
        let checker = EligibilityChecker::new(setup(true, false, false));
        assert!(matches!(
            checker.check_can_cast(&USER, &CATEGORY, &NOMINEE, VoteType::Paid),
            Err(VotingError::NomineeNotActive)
        ));
    }

    #[test]
    fn unassigned_nominee_rejected() {
        let checker = EligibilityChecker::new(setup(true, true, false));
        assert!(matches!(
            checker.check_can_cast(&USER, &CATEGORY, &NOMINEE, VoteType::Paid),
            Err(VotingError::NomineeNotInCategory)
        ));
    }

    #[test]
    fn missing_records_are_not_found() {
        let checker = EligibilityChecker::new(setup(true, true, true));
        assert!(matches!(
            checker.check_can_cast(&USER, &CategoryId::from_u128(99), &NOMINEE, VoteType::Free),
            Err(VotingError::NotFound(_))
        ));
        assert!(matches!(
            checker.check_can_cast(&USER, &CATEGORY, &NomineeId::from_u128(99), VoteType::Free),
            Err(VotingError::NotFound(_))
        ));
    }

    #[test]
    fn free_vote_capped_paid_uncapped() {
        let store = setup(true, true, true);
        store
            .insert_vote(&Vote {
                id: VoteId::from_u128(7),
                user_id: USER,
                category_id: CATEGORY,
                nominee_id: NOMINEE,
                vote_type: VoteType::Free,
                created_at: Timestamp::new(2),
                updated_at: Timestamp::new(2),
            })
            .unwrap();
        let checker = EligibilityChecker::new(store);
        assert!(!checker
            .can_vote_in_category(&USER, &CATEGORY, VoteType::Free)
            .unwrap());
        assert!(checker
            .can_vote_in_category(&USER, &CATEGORY, VoteType::Paid)
            .unwrap());
        assert!(matches!(
            checker.check_can_cast(&USER, &CATEGORY, &NOMINEE, VoteType::Free),
            Err(VotingError::AlreadyVotedWithFreeVote)
        ));
        checker
            .check_can_cast(&USER, &CATEGORY, &NOMINEE, VoteType::Paid)
            .unwrap();
    }
}
