//! LMDB database integrity checks.
//!
//! Run on startup (and from the `check` command) to detect corruption and
//! index drift before any vote is cast.

use std::path::Path;

use awards_store::vote::Vote;
use awards_types::VoteType;
use serde::Serialize;

use crate::environment::{composite_key, decode, id_bytes, DATABASE_NAMES};
use crate::{LmdbEnvironment, LmdbError};

/// Summary of an integrity check run.
#[derive(Debug, Default, Serialize)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub free_votes_checked: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check every database and the free-vote uniqueness index.
///
/// Read failures are recorded in the report rather than causing a hard
/// error. The index check verifies both directions: each free vote row has
/// its `(user, category)` index entry pointing back at it, and each index
/// entry points at a live free vote.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = env.env().read_txn()?;

    for &db_name in DATABASE_NAMES {
        match env
            .env()
            .open_database::<heed::types::Bytes, heed::types::Bytes>(&rtxn, Some(db_name))
        {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{}': {}", db_name, e)),
                }
            }
            Ok(None) => report
                .errors
                .push(format!("database '{}' is missing", db_name)),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{}': {}", db_name, e)),
        }
    }

    for entry in env.votes_db.iter(&rtxn)? {
        let (_, val) = entry?;
        let vote: Vote = match decode(val) {
            Ok(v) => v,
            Err(e) => {
                report.errors.push(format!("undecodable vote row: {}", e));
                continue;
            }
        };
        if vote.vote_type != VoteType::Free {
            continue;
        }
        report.free_votes_checked += 1;
        let key = composite_key(vote.user_id.as_bytes(), vote.category_id.as_bytes());
        match env.free_votes_db.get(&rtxn, &key)? {
            Some(indexed) if id_bytes(indexed)? == *vote.id.as_bytes() => {}
            Some(_) => report.errors.push(format!(
                "free vote {} shadowed by another index entry for user {} category {}",
                vote.id, vote.user_id, vote.category_id
            )),
            None => report
                .errors
                .push(format!("free vote {} missing from uniqueness index", vote.id)),
        }
    }

    for entry in env.free_votes_db.iter(&rtxn)? {
        let (_, val) = entry?;
        let id = id_bytes(val)?;
        match env.votes_db.get(&rtxn, &id)? {
            Some(bytes) => {
                let vote: Vote = decode(bytes)?;
                if vote.vote_type != VoteType::Free {
                    report
                        .errors
                        .push(format!("uniqueness index points at paid vote {}", vote.id));
                }
            }
            None => report.errors.push(format!(
                "uniqueness index points at missing vote {}",
                awards_types::VoteId::from_bytes(id)
            )),
        }
    }

    if !report.is_healthy() {
        tracing::warn!(errors = report.errors.len(), "integrity check found problems");
    }
    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing, which suggests
/// corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use awards_store::VoteStore;
    use awards_types::{CategoryId, NomineeId, Timestamp, UserId, VoteId};

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16, 1 << 20).unwrap();
        (dir, env)
    }

    #[test]
    fn check_data_dir_fresh_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(&dir.path().join("not-yet")).is_ok());
    }

    #[test]
    fn check_data_dir_without_data_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(dir.path()).is_err());
    }

    #[test]
    fn fresh_environment_is_healthy() {
        let (_dir, env) = temp_env();
        let report = check_integrity(&env).unwrap();
        assert!(report.is_healthy(), "{:?}", report.errors);
        assert_eq!(report.databases_checked, DATABASE_NAMES.len() as u32);
    }

    #[test]
    fn detects_dangling_uniqueness_entry() {
        let (_dir, env) = temp_env();
        let vote = Vote {
            id: VoteId::from_u128(1),
            user_id: UserId::from_u128(1),
            category_id: CategoryId::from_u128(2),
            nominee_id: NomineeId::from_u128(3),
            vote_type: VoteType::Free,
            created_at: Timestamp::new(1),
            updated_at: Timestamp::new(1),
        };
        env.insert_vote(&vote).unwrap();
        assert_eq!(check_integrity(&env).unwrap().free_votes_checked, 1);

        let mut wtxn = env.env().write_txn().unwrap();
        env.votes_db.delete(&mut wtxn, vote.id.as_bytes()).unwrap();
        wtxn.commit().unwrap();

        let report = check_integrity(&env).unwrap();
        assert!(!report.is_healthy());
    }
}
