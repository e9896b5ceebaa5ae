//! Schema versioning for the awards store.
//!
//! The version lives in the meta database. Opening a store walks it forward
//! one step at a time until it reaches [`CURRENT_SCHEMA_VERSION`]; a store
//! stamped by a newer build is left untouched and refused.

use awards_store::MetaStore;

use crate::LmdbError;

/// Schema written by this build.
///
/// 1: users with e-mail index, categories, nominees, nominee/category links,
/// votes with the per-(user, category) free-vote index.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// One forward step, from `target - 1` to `target`.
struct SchemaStep {
    target: u32,
    describe: &'static str,
    apply: fn() -> Result<(), LmdbError>,
}

const STEPS: &[SchemaStep] = &[SchemaStep {
    target: 1,
    describe: "initial awards layout",
    apply: initial_layout,
}];

// Every database is created by `LmdbEnvironment::open`.
fn initial_layout() -> Result<(), LmdbError> {
    Ok(())
}

pub struct Migrator;

impl Migrator {
    /// Bring the store's schema to [`CURRENT_SCHEMA_VERSION`].
    pub fn run(meta: &impl MetaStore) -> Result<(), LmdbError> {
        let stored = meta
            .get_schema_version()
            .map_err(|e| LmdbError::Schema(format!("reading schema version: {e}")))?;

        if stored > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::Schema(format!(
                "store has schema {stored}, this build understands up to {CURRENT_SCHEMA_VERSION}"
            )));
        }
        if stored == CURRENT_SCHEMA_VERSION {
            tracing::debug!(schema = stored, "awards schema current");
            return Ok(());
        }

        for step in pending_steps(stored)? {
            tracing::info!(schema = step.target, step = step.describe, "upgrading awards schema");
            (step.apply)()?;
            meta.set_schema_version(step.target)
                .map_err(|e| LmdbError::Schema(format!("stamping schema {}: {e}", step.target)))?;
        }
        Ok(())
    }
}

/// The steps taking `stored` to the current schema, in order.
fn pending_steps(stored: u32) -> Result<Vec<&'static SchemaStep>, LmdbError> {
    (stored + 1..=CURRENT_SCHEMA_VERSION)
        .map(|target| {
            STEPS
                .iter()
                .find(|step| step.target == target)
                .ok_or_else(|| LmdbError::Schema(format!("no upgrade path to schema {target}")))
        })
        .collect()
}
