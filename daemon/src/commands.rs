//! Subcommands and their execution. Every command yields a JSON value.

use awards_store_lmdb::{check_integrity, LmdbEnvironment};
use awards_types::{CategoryId, NomineeId, UserId, VoteId};
use awards_voting::VotingCoordinator;
use serde_json::{json, Value};

#[derive(clap::Subcommand)]
pub enum Command {
    /// Manage voters and their balances.
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage award categories.
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage nominees and their category assignments.
    Nominee {
        #[command(subcommand)]
        action: NomineeAction,
    },
    /// Cast, change, delete and list votes.
    Vote {
        #[command(subcommand)]
        action: VoteAction,
    },
    /// Vote tallies.
    Results {
        #[command(subcommand)]
        action: ResultsAction,
    },
    /// Verify store integrity.
    Check,
}

#[derive(clap::Subcommand)]
pub enum UserAction {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    Show {
        id: UserId,
    },
    /// Credit purchased paid votes.
    TopUp {
        id: UserId,
        amount: u32,
    },
}

#[derive(clap::Subcommand)]
pub enum CategoryAction {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Activate {
        id: CategoryId,
    },
    Deactivate {
        id: CategoryId,
    },
    List,
    /// Nominees assigned to a category.
    Nominees {
        id: CategoryId,
    },
}

#[derive(clap::Subcommand)]
pub enum NomineeAction {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Activate {
        id: NomineeId,
    },
    Deactivate {
        id: NomineeId,
    },
    Assign {
        nominee: NomineeId,
        category: CategoryId,
    },
    Unassign {
        nominee: NomineeId,
        category: CategoryId,
    },
    List,
    /// Categories a nominee is assigned to.
    Categories {
        id: NomineeId,
    },
}

#[derive(clap::Subcommand)]
pub enum VoteAction {
    Cast {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        nominee: NomineeId,
        #[arg(long)]
        category: CategoryId,
        /// Spend a paid vote instead of a free one.
        #[arg(long)]
        paid: bool,
    },
    Change {
        vote: VoteId,
        #[arg(long)]
        nominee: NomineeId,
    },
    Delete {
        vote: VoteId,
    },
    Show {
        vote: VoteId,
    },
    /// All votes, or only one user's.
    List {
        #[arg(long)]
        user: Option<UserId>,
    },
}

#[derive(clap::Subcommand)]
pub enum ResultsAction {
    Category { id: CategoryId },
    Nominee { id: NomineeId },
    User { id: UserId },
}

pub fn run(
    command: Command,
    env: &LmdbEnvironment,
    coordinator: &VotingCoordinator<LmdbEnvironment>,
) -> anyhow::Result<Value> {
    let registry = coordinator.registry();
    let analytics = coordinator.analytics();

    let value = match command {
        Command::User { action } => match action {
            UserAction::Add { name, email } => {
                serde_json::to_value(registry.register_user(&name, &email)?)?
            }
            UserAction::Show { id } => json!({
                "user": registry.get_user(&id)?,
                "available": coordinator.get_available_votes(&id)?,
            }),
            UserAction::TopUp { id, amount } => {
                serde_json::to_value(coordinator.top_up_paid(&id, amount)?)?
            }
        },
        Command::Category { action } => match action {
            CategoryAction::Add { name, description } => {
                serde_json::to_value(registry.create_category(&name, &description)?)?
            }
            CategoryAction::Activate { id } => {
                serde_json::to_value(registry.set_category_active(&id, true)?)?
            }
            CategoryAction::Deactivate { id } => {
                serde_json::to_value(registry.set_category_active(&id, false)?)?
            }
            CategoryAction::List => serde_json::to_value(registry.list_categories()?)?,
            CategoryAction::Nominees { id } => {
                serde_json::to_value(registry.nominees_in_category(&id)?)?
            }
        },
        Command::Nominee { action } => match action {
            NomineeAction::Add { name, description } => {
                serde_json::to_value(registry.create_nominee(&name, &description)?)?
            }
            NomineeAction::Activate { id } => {
                serde_json::to_value(registry.set_nominee_active(&id, true)?)?
            }
            NomineeAction::Deactivate { id } => {
                serde_json::to_value(registry.set_nominee_active(&id, false)?)?
            }
            NomineeAction::Assign { nominee, category } => {
                registry.assign_nominee(&nominee, &category)?;
                json!({ "assigned": true })
            }
            NomineeAction::Unassign { nominee, category } => {
                json!({ "removed": registry.unassign_nominee(&nominee, &category)? })
            }
            NomineeAction::List => serde_json::to_value(registry.list_nominees()?)?,
            NomineeAction::Categories { id } => {
                serde_json::to_value(registry.categories_for_nominee(&id)?)?
            }
        },
        Command::Vote { action } => match action {
            VoteAction::Cast {
                user,
                nominee,
                category,
                paid,
            } => serde_json::to_value(coordinator.cast_vote(&user, &nominee, &category, paid)?)?,
            VoteAction::Change { vote, nominee } => {
                serde_json::to_value(coordinator.change_vote(&vote, &nominee)?)?
            }
            VoteAction::Delete { vote } => {
                coordinator.delete_vote(&vote)?;
                json!({ "deleted": vote })
            }
            VoteAction::Show { vote } => serde_json::to_value(coordinator.get_vote(&vote)?)?,
            VoteAction::List { user: Some(user) } => {
                serde_json::to_value(coordinator.get_user_votes(&user)?)?
            }
            VoteAction::List { user: None } => serde_json::to_value(coordinator.get_all_votes()?)?,
        },
        Command::Results { action } => match action {
            ResultsAction::Category { id } => {
                serde_json::to_value(analytics.category_vote_stats(&id)?)?
            }
            ResultsAction::Nominee { id } => {
                serde_json::to_value(analytics.nominee_vote_stats(&id)?)?
            }
            ResultsAction::User { id } => serde_json::to_value(analytics.user_vote_summary(&id)?)?,
        },
        Command::Check => {
            let report = check_integrity(env)?;
            if !report.is_healthy() {
                anyhow::bail!("integrity check failed: {}", report.errors.join("; "));
            }
            serde_json::to_value(report)?
        }
    };
    Ok(value)
}
