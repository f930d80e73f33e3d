//! Per-host wiring of storage and collaborators.

use crate::config::ApiConfig;
use clinic_core::db::{open_db, DbResult};
use clinic_core::{
    AccountService, AssignmentNotifier, CredentialHasher, RecordService, RepoResult,
    SqliteAccountRepository, SqliteRecordRepository,
};
use rusqlite::Connection;
use std::sync::Arc;

/// Everything a request needs besides its own envelope.
///
/// Owns one connection; hosts serving concurrent requests keep one context
/// per worker.
pub struct ApiContext {
    conn: Connection,
    hasher: Arc<dyn CredentialHasher + Send + Sync>,
    notifier: Arc<dyn AssignmentNotifier>,
}

impl ApiContext {
    pub fn new(
        conn: Connection,
        hasher: Arc<dyn CredentialHasher + Send + Sync>,
        notifier: Arc<dyn AssignmentNotifier>,
    ) -> Self {
        Self {
            conn,
            hasher,
            notifier,
        }
    }

    /// Opens the configured database and builds a context around it.
    pub fn open(
        config: &ApiConfig,
        hasher: Arc<dyn CredentialHasher + Send + Sync>,
        notifier: Arc<dyn AssignmentNotifier>,
    ) -> DbResult<Self> {
        let conn = open_db(&config.db_path)?;
        Ok(Self::new(conn, hasher, notifier))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn hasher(&self) -> &dyn CredentialHasher {
        self.hasher.as_ref()
    }

    pub fn accounts(&self) -> RepoResult<AccountService<SqliteAccountRepository<'_>>> {
        let repo = SqliteAccountRepository::try_new(&self.conn)?;
        Ok(AccountService::new(repo, Arc::clone(&self.notifier)))
    }

    pub fn records(
        &self,
    ) -> RepoResult<RecordService<SqliteAccountRepository<'_>, SqliteRecordRepository<'_>>> {
        Ok(RecordService::new(
            SqliteAccountRepository::try_new(&self.conn)?,
            SqliteRecordRepository::try_new(&self.conn)?,
        ))
    }
}
