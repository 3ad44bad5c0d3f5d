use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub(super) struct DbState {
    db_file: PathBuf,
    pub(super) pool: SqlitePool,
}

impl std::fmt::Debug for DbState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbState")
            .field("db_file", &self.db_file)
            .finish()
    }
}

impl DbState {
    /// Back up an existing database to `<file>.bak`, then open it and apply migrations
    pub(super) async fn open<P: AsRef<Path>>(db_file: P) -> anyhow::Result<Self> {
        let db_file = db_file.as_ref().to_path_buf();

        if db_file.is_file() {
            let backup = backup_path(&db_file);
            match std::fs::copy(&db_file, &backup) {
                Ok(_) => info!("Backed up {:?} to {:?}", db_file, backup),
                Err(e) => warn!("Could not create backup {:?}: {}", backup, e),
            }
        }

        let connect_opts = SqliteConnectOptions::new()
            .filename(&db_file)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await
            .with_context(|| format!("Failed to open database {:?}", db_file))?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { db_file, pool })
    }

    pub(super) fn db_file(&self) -> &Path {
        &self.db_file
    }

    pub(super) async fn close(&self) {
        self.pool.close().await;
    }
}

pub(super) fn backup_path(db_file: &Path) -> PathBuf {
    let mut name = db_file.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}
