use awards_store::StoreError;
use awards_types::{UserId, VoteType};
use thiserror::Error;

/// Broad classes of [`VotingError`], for callers deciding how to respond.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request can be corrected by the caller; retrying as-is won't help.
    Validation,
    /// The user's pool is empty; nothing helps until the balance changes.
    Exhausted,
    /// The record already exists. For a free vote the caller may switch to a
    /// paid one.
    Conflict,
    NotFound,
    /// Storage failure, or a vote unit that could not be returned.
    Internal,
}

#[derive(Debug, Error)]
pub enum VotingError {
    #[error("category is not active")]
    CategoryNotActive,

    #[error("nominee is not active")]
    NomineeNotActive,

    #[error("nominee not in category")]
    NomineeNotInCategory,

    #[error("voting period is closed")]
    VotingPeriodClosed,

    #[error("no free votes available")]
    NoFreeVotesAvailable,

    #[error("no paid votes available")]
    NoPaidVotesAvailable,

    #[error("already voted in this category with free vote")]
    AlreadyVotedWithFreeVote,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Duplicate(String),

    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("vote balance overflow for user {0}")]
    BalanceOverflow(UserId),

    #[error("store error: {0}")]
    Store(StoreError),

    /// A debited unit could not be credited back. The user has permanently
    /// lost one vote from `pool` until an operator restores it.
    #[error("compensating {pool} credit for user {user} failed: {source}")]
    CompensationFailed {
        user: UserId,
        pool: VoteType,
        #[source]
        source: Box<VotingError>,
    },
}

impl VotingError {
    /// The exhaustion error for an empty pool.
    pub fn exhausted(pool: VoteType) -> Self {
        match pool {
            VoteType::Free => Self::NoFreeVotesAvailable,
            VoteType::Paid => Self::NoPaidVotesAvailable,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CategoryNotActive
            | Self::NomineeNotActive
            | Self::NomineeNotInCategory
            | Self::VotingPeriodClosed
            | Self::InvalidAmount => ErrorKind::Validation,
            Self::NoFreeVotesAvailable | Self::NoPaidVotesAvailable => ErrorKind::Exhausted,
            Self::AlreadyVotedWithFreeVote | Self::Duplicate(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::BalanceOverflow(_) | Self::Store(_) | Self::CompensationFailed { .. } => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<StoreError> for VotingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Duplicate(what) => Self::Duplicate(what),
            other => Self::Store(other),
        }
    }
}
