/// Schema migrations
///
/// Migrations live in the workspace-level `migrations/` directory and are
/// embedded into the binary at compile time by `sqlx::migrate!`. Each file is
/// named `{timestamp}_{name}.sql` and applied once, in order.
///
/// # Example
///
/// ```no_run
/// use recipebook_shared::db::pool::{create_pool, DatabaseConfig};
/// use recipebook_shared::db::migrations::{run_migrations, get_migration_status};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     run_migrations(&pool).await?;
///
///     let status = get_migration_status(&pool).await?;
///     println!("Applied {} migrations", status.applied_migrations);
///     Ok(())
/// }
/// ```

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

/// Migration status information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Number of migrations recorded as applied
    pub applied_migrations: usize,

    /// Latest applied migration version (timestamp prefix)
    pub latest_version: Option<i64>,

    /// Whether every embedded migration has been applied
    pub is_up_to_date: bool,
}

/// Versions of the migrations compiled into this binary
pub fn embedded_versions() -> Vec<i64> {
    sqlx::migrate!("../migrations")
        .iter()
        .map(|migration| migration.version)
        .collect()
}

/// Applies all pending migrations
///
/// # Errors
///
/// Returns an error if a migration fails; the failing migration is rolled
/// back.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    match sqlx::migrate!("../migrations").run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Migration failed");
            Err(e)
        }
    }
}

/// Reports which migrations have been applied
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
            is_up_to_date: embedded_versions().is_empty(),
        });
    }

    let applied: Vec<i64> = sqlx::query_scalar(
        "SELECT version FROM _sqlx_migrations WHERE success = true ORDER BY version",
    )
    .fetch_all(pool)
    .await?;

    Ok(status_from_versions(&applied, &embedded_versions()))
}

fn status_from_versions(applied: &[i64], embedded: &[i64]) -> MigrationStatus {
    MigrationStatus {
        applied_migrations: applied.len(),
        latest_version: applied.iter().copied().max(),
        is_up_to_date: embedded.iter().all(|version| applied.contains(version)),
    }
}

/// Creates the database if it doesn't exist (development and tests)
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if !Postgres::database_exists(database_url).await? {
        info!("Database does not exist, creating it");
        Postgres::create_database(database_url).await?;
    } else {
        debug!("Database already exists");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_migrations_are_ordered() {
        let versions = embedded_versions();
        assert_eq!(versions.len(), 4);
        assert!(versions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_status_up_to_date() {
        let status = status_from_versions(&[1, 2, 3], &[1, 2, 3]);
        assert_eq!(status.applied_migrations, 3);
        assert_eq!(status.latest_version, Some(3));
        assert!(status.is_up_to_date);
    }

    #[test]
    fn test_status_pending() {
        let status = status_from_versions(&[1], &[1, 2]);
        assert!(!status.is_up_to_date);
        assert_eq!(status.latest_version, Some(1));
    }

    #[test]
    fn test_status_empty_database() {
        let status = status_from_versions(&[], &[1]);
        assert_eq!(status.applied_migrations, 0);
        assert_eq!(status.latest_version, None);
        assert!(!status.is_up_to_date);
    }
}
