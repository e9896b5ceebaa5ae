//! Voting coordinator.
//!
//! Runs each voting operation end to end: eligibility, the ledger debit or
//! credit, and the vote row write. A debit that is not followed by a durable
//! vote is credited back, whether the insert failed or the request was torn
//! down in between.

use std::sync::Arc;

use awards_store::{EntityStore, Vote};
use awards_types::{CategoryId, Clock, NomineeId, SystemClock, UserId, VoteId, VoteType, VotingParams};
use awards_utils::StatsCounter;

use crate::analytics::AnalyticsAggregator;
use crate::eligibility::EligibilityChecker;
use crate::ledger::{VoteLedger, STAT_COMPENSATIONS, STAT_UNITS_LOST};
use crate::registry::Registry;
use crate::view::{AvailableVotes, VoteView};
use crate::VotingError;

pub const STAT_CAST: &str = "votes_cast";
pub const STAT_CHANGED: &str = "votes_changed";
pub const STAT_DELETED: &str = "votes_deleted";

/// Every counter the coordinator maintains.
pub const STAT_NAMES: &[&str] = &[
    STAT_CAST,
    STAT_CHANGED,
    STAT_DELETED,
    STAT_COMPENSATIONS,
    STAT_UNITS_LOST,
];

pub struct VotingCoordinator<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    eligibility: EligibilityChecker<S>,
    ledger: VoteLedger<S>,
    registry: Registry<S>,
    analytics: AnalyticsAggregator<S>,
    stats: Arc<StatsCounter>,
}

impl<S: EntityStore> VotingCoordinator<S> {
    pub fn new(store: Arc<S>, params: VotingParams) -> Self {
        Self::with_clock(store, params, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, params: VotingParams, clock: Arc<dyn Clock>) -> Self {
        let stats = Arc::new(StatsCounter::new(STAT_NAMES));
        Self {
            eligibility: EligibilityChecker::new(Arc::clone(&store)),
            ledger: VoteLedger::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                params.credit_retry_attempts,
                Arc::clone(&stats),
            ),
            registry: Registry::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                params.default_free_votes,
            ),
            analytics: AnalyticsAggregator::new(Arc::clone(&store)),
            store,
            clock,
            stats,
        }
    }

    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    pub fn analytics(&self) -> &AnalyticsAggregator<S> {
        &self.analytics
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    /// Cast a vote for `nominee` in `category`, spending one unit from the
    /// pool selected by `use_paid`.
    pub fn cast_vote(
        &self,
        user: &UserId,
        nominee: &NomineeId,
        category: &CategoryId,
        use_paid: bool,
    ) -> Result<VoteView, VotingError> {
        let vote_type = VoteType::from_paid_flag(use_paid);
        self.eligibility
            .check_can_cast(user, category, nominee, vote_type)?;

        let debit = self.ledger.debit(user, vote_type)?;
        let now = self.clock.now();
        let vote = Vote {
            id: VoteId::generate(),
            user_id: *user,
            category_id: *category,
            nominee_id: *nominee,
            vote_type,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.store.insert_vote(&vote) {
            tracing::warn!(%user, %category, error = %e, "vote insert failed after debit");
            debit.refund()?;
            // A concurrent free vote for the same category won the race.
            if e.is_duplicate() && vote_type == VoteType::Free {
                return Err(VotingError::AlreadyVotedWithFreeVote);
            }
            return Err(e.into());
        }
        debit.commit();

        self.stats.increment(STAT_CAST);
        tracing::info!(vote = %vote.id, %user, %category, %nominee, %vote_type, "vote cast");
        // The unit is spent and the row is durable; a failed read must not
        // look like a failed cast.
        match self.store.get_vote(&vote.id) {
            Ok(stored) => Ok(stored.into()),
            Err(e) => {
                tracing::warn!(vote = %vote.id, error = %e, "reload of cast vote failed");
                Ok(vote.into())
            }
        }
    }

    /// Point an existing vote at another nominee in the same category.
    ///
    /// The vote keeps its type and no unit moves.
    pub fn change_vote(&self, vote: &VoteId, new_nominee: &NomineeId) -> Result<VoteView, VotingError> {
        let existing = self.store.get_vote(vote)?;
        self.eligibility
            .check_nominee_for_category(new_nominee, &existing.category_id)?;
        let updated = self
            .store
            .set_vote_nominee(vote, new_nominee, self.clock.now())?;

        self.stats.increment(STAT_CHANGED);
        tracing::info!(
            %vote,
            from = %existing.nominee_id,
            to = %new_nominee,
            "vote changed"
        );
        Ok(updated.into())
    }

    /// Remove a vote and return its unit to the pool it came from.
    pub fn delete_vote(&self, vote: &VoteId) -> Result<(), VotingError> {
        let removed = self.store.delete_vote(vote)?;
        self.stats.increment(STAT_DELETED);
        tracing::info!(%vote, user = %removed.user_id, pool = %removed.vote_type, "vote deleted");
        self.ledger.restore(&removed.user_id, removed.vote_type)
    }

    pub fn get_available_votes(&self, user: &UserId) -> Result<AvailableVotes, VotingError> {
        Ok(self.ledger.balance(user)?.into())
    }

    pub fn top_up_paid(&self, user: &UserId, amount: u32) -> Result<AvailableVotes, VotingError> {
        Ok(self.ledger.top_up_paid(user, amount)?.into())
    }

    pub fn get_vote(&self, vote: &VoteId) -> Result<VoteView, VotingError> {
        Ok(self.store.get_vote(vote)?.into())
    }

    /// A user's votes, oldest first.
    pub fn get_user_votes(&self, user: &UserId) -> Result<Vec<VoteView>, VotingError> {
        Ok(chronological(self.store.votes_for_user(user)?))
    }

    pub fn get_all_votes(&self) -> Result<Vec<VoteView>, VotingError> {
        Ok(chronological(self.store.iter_votes()?))
    }

    pub fn can_vote_in_category(
        &self,
        user: &UserId,
        category: &CategoryId,
        use_paid: bool,
    ) -> Result<bool, VotingError> {
        self.eligibility
            .can_vote_in_category(user, category, VoteType::from_paid_flag(use_paid))
    }

    pub fn validate_voting_period(&self, category: &CategoryId) -> Result<bool, VotingError> {
        let category = self.store.get_category(category)?;
        Ok(self.eligibility.validate_voting_period(&category))
    }
}

fn chronological(mut votes: Vec<Vote>) -> Vec<VoteView> {
    votes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    votes.into_iter().map(VoteView::from).collect()
}
