//! Vote allocation for the awards service.
//!
//! A user holds two counters, free and paid. Casting a vote spends one unit
//! from the chosen pool; deleting it gives the unit back. At most one free
//! vote may exist per user and category, while paid votes are uncapped.
//!
//! [`VotingCoordinator`] is the entry point. It is generic over any
//! [`awards_store::EntityStore`] and is shared across request threads.

pub mod analytics;
pub mod coordinator;
pub mod eligibility;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod view;

pub use analytics::AnalyticsAggregator;
pub use coordinator::{VotingCoordinator, STAT_CAST, STAT_CHANGED, STAT_DELETED, STAT_NAMES};
pub use eligibility::EligibilityChecker;
pub use error::{ErrorKind, VotingError};
pub use ledger::{Debit, VoteLedger, STAT_COMPENSATIONS, STAT_UNITS_LOST};
pub use registry::Registry;
pub use view::{AvailableVotes, UserVoteSummary, VoteCount, VoteView};
