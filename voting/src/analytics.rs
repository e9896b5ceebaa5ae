//! Read-only vote tallies.
//!
//! Each query reads the votes it needs once and aggregates in memory. No
//! lease is taken, so a tally may miss a vote being cast concurrently.

use std::collections::BTreeMap;
use std::sync::Arc;

use awards_store::{NomineeStore, StoreError, Vote, VoteStore};
use awards_types::{CategoryId, NomineeId, UserId, VoteType};

use crate::view::{UserVoteSummary, VoteCount};
use crate::VotingError;

#[derive(Default)]
struct Tally {
    free: u64,
    paid: u64,
}

impl Tally {
    fn add(&mut self, vote_type: VoteType) {
        match vote_type {
            VoteType::Free => self.free += 1,
            VoteType::Paid => self.paid += 1,
        }
    }
}

pub struct AnalyticsAggregator<S> {
    store: Arc<S>,
}

impl<S: NomineeStore + VoteStore> AnalyticsAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Per-nominee totals within `category`, highest first.
    pub fn category_vote_stats(&self, category: &CategoryId) -> Result<Vec<VoteCount>, VotingError> {
        let votes = self.store.votes_for_category(category)?;
        let tallies = tally_by(&votes, |v| (v.nominee_id, v.category_id));
        self.counts_from(tallies)
    }

    /// Totals for `nominee` in each category it has received votes in,
    /// highest first.
    pub fn nominee_vote_stats(&self, nominee: &NomineeId) -> Result<Vec<VoteCount>, VotingError> {
        let votes = self.store.votes_for_nominee(nominee)?;
        let tallies = tally_by(&votes, |v| (v.nominee_id, v.category_id));
        self.counts_from(tallies)
    }

    /// Free and paid votes `user` has spent, per category.
    pub fn user_vote_summary(&self, user: &UserId) -> Result<Vec<UserVoteSummary>, VotingError> {
        let votes = self.store.votes_for_user(user)?;
        Ok(tally_by(&votes, |v| v.category_id)
            .into_iter()
            .map(|(category_id, tally)| UserVoteSummary {
                user_id: *user,
                category_id,
                free_votes_used: tally.free,
                paid_votes_used: tally.paid,
            })
            .collect())
    }

    fn counts_from(
        &self,
        tallies: BTreeMap<(NomineeId, CategoryId), Tally>,
    ) -> Result<Vec<VoteCount>, VotingError> {
        let mut counts = Vec::with_capacity(tallies.len());
        for ((nominee_id, category_id), tally) in tallies {
            counts.push(VoteCount {
                nominee_id,
                nominee_name: self.nominee_name(&nominee_id)?,
                category_id,
                total_votes: tally.free + tally.paid,
                free_votes: tally.free,
                paid_votes: tally.paid,
            });
        }
        counts.sort_by(|a, b| {
            b.total_votes
                .cmp(&a.total_votes)
                .then_with(|| a.nominee_name.cmp(&b.nominee_name))
                .then_with(|| a.nominee_id.cmp(&b.nominee_id))
                .then_with(|| a.category_id.cmp(&b.category_id))
        });
        Ok(counts)
    }

    fn nominee_name(&self, id: &NomineeId) -> Result<String, VotingError> {
        match self.store.get_nominee(id) {
            Ok(nominee) => Ok(nominee.name),
            // Nominees are never deleted, but a tally should not fail on a
            // dangling reference.
            Err(StoreError::NotFound(_)) => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

fn tally_by<K: Ord>(votes: &[Vote], key: impl Fn(&Vote) -> K) -> BTreeMap<K, Tally> {
    let mut tallies: BTreeMap<K, Tally> = BTreeMap::new();
    for vote in votes {
        tallies.entry(key(vote)).or_default().add(vote.vote_type);
    }
    tallies
}

#[cfg(test)]
mod tests {
    use super::*;
    use awards_nullables::NullStore;
    use awards_store::Nominee;
    use awards_types::{Timestamp, VoteId};

    fn nominee(store: &NullStore, id: u128, name: &str) {
        store
            .put_nominee(&Nominee {
                id: NomineeId::from_u128(id),
                name: name.into(),
                description: String::new(),
                is_active: true,
                created_at: Timestamp::new(1),
            })
            .unwrap();
    }

    fn vote(store: &NullStore, id: u128, user: u128, category: u128, nominee: u128, paid: bool) {
        store
            .insert_vote(&Vote {
                id: VoteId::from_u128(id),
                user_id: UserId::from_u128(user),
                category_id: CategoryId::from_u128(category),
                nominee_id: NomineeId::from_u128(nominee),
                vote_type: VoteType::from_paid_flag(paid),
                created_at: Timestamp::new(2),
                updated_at: Timestamp::new(2),
            })
            .unwrap();
    }

    fn populated() -> AnalyticsAggregator<NullStore> {
        let store = NullStore::new();
        nominee(&store, 100, "Zed");
        nominee(&store, 101, "Amy");
        vote(&store, 1, 1, 10, 100, false);
        vote(&store, 2, 1, 10, 100, true);
        vote(&store, 3, 2, 10, 101, false);
        vote(&store, 4, 2, 11, 100, true);
        AnalyticsAggregator::new(Arc::new(store))
    }

    #[test]
    fn category_stats_sorted_by_total() {
        let stats = populated()
            .category_vote_stats(&CategoryId::from_u128(10))
            .unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].nominee_name, "Zed");
        assert_eq!((stats[0].total_votes, stats[0].free_votes, stats[0].paid_votes), (2, 1, 1));
        assert_eq!(stats[1].nominee_name, "Amy");
        assert_eq!(stats[1].total_votes, 1);
    }

    #[test]
    fn nominee_stats_span_categories() {
        let stats = populated()
            .nominee_vote_stats(&NomineeId::from_u128(100))
            .unwrap();
        let categories: Vec<_> = stats.iter().map(|c| c.category_id).collect();
        assert_eq!(
            categories,
            vec![CategoryId::from_u128(10), CategoryId::from_u128(11)]
        );
        assert_eq!(stats[1].paid_votes, 1);
    }

    #[test]
    fn user_summary_per_category() {
        let summary = populated()
            .user_vote_summary(&UserId::from_u128(2))
            .unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!((summary[0].free_votes_used, summary[0].paid_votes_used), (1, 0));
        assert_eq!((summary[1].free_votes_used, summary[1].paid_votes_used), (0, 1));
    }

    #[test]
    fn empty_category_has_no_rows() {
        assert!(populated()
            .category_vote_stats(&CategoryId::from_u128(99))
            .unwrap()
            .is_empty());
    }
}
