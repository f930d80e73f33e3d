//! Embedded schema migrations.
//!
//! Each step is a SQL script compiled into the binary. Steps run in version
//! order inside one transaction, and the reached version is written to
//! `PRAGMA user_version` after every step.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

/// Versions start at 1 and increase by exactly one per step.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "clinic_schema",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "integrity_triggers",
        sql: include_str!("0002_integrity_triggers.sql"),
    },
];

/// Schema version this build migrates to.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |step| step.version)
}

/// Brings the schema from its stored version up to [`latest_version`].
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the file was written by a
///   newer build.
/// - SQLite failures; the whole upgrade is rolled back.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = current_user_version(conn)?;
    let to_version = latest_version();
    if from_version > to_version {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: to_version,
        });
    }

    let pending = pending_after(from_version);
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        from_version, to_version
    );
    Ok(())
}

/// Stored schema version; 0 for a fresh database.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}

fn pending_after(version: u32) -> &'static [Migration] {
    let applied = MIGRATIONS
        .iter()
        .take_while(|step| step.version <= version)
        .count();
    &MIGRATIONS[applied..]
}

#[cfg(test)]
mod tests {
    use super::{latest_version, pending_after, MIGRATIONS};

    #[test]
    fn versions_are_contiguous_from_one() {
        for (index, step) in MIGRATIONS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "{}", step.name);
        }
        assert_eq!(latest_version() as usize, MIGRATIONS.len());
    }

    #[test]
    fn pending_after_skips_applied_steps() {
        assert_eq!(pending_after(0).len(), MIGRATIONS.len());
        assert_eq!(pending_after(1)[0].version, 2);
        assert!(pending_after(latest_version()).is_empty());
    }
}
