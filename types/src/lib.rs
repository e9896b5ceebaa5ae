//! Fundamental types for the awards voting core.
//!
//! This crate defines the identifiers, vote pools, timestamps and tunable
//! parameters shared by every other crate in the workspace.

pub mod id;
pub mod params;
pub mod time;
pub mod vote_type;

pub use id::{CategoryId, IdParseError, NomineeId, UserId, VoteId};
pub use params::VotingParams;
pub use time::{Clock, SystemClock, Timestamp};
pub use vote_type::VoteType;
