/// Embedded schema migrations
///
/// SQL files under `hearth-shared/migrations/` are compiled into the binary
/// with `sqlx::migrate!` and applied at startup.

use sqlx::postgres::PgPool;
use tracing::{debug, info, warn};

/// Applies every pending migration
///
/// # Errors
///
/// Fails if a migration cannot be applied or a previously applied one has
/// changed on disk.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    match sqlx::migrate!("./migrations").run(pool).await {
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

/// Versions of successfully applied migrations, oldest first
pub async fn applied_versions(pool: &PgPool) -> Result<Vec<i64>, sqlx::Error> {
    let versions: Vec<i64> = sqlx::query_scalar(
        "SELECT version FROM _sqlx_migrations WHERE success = true ORDER BY version",
    )
    .fetch_all(pool)
    .await?;

    debug!(applied = versions.len(), "Read migration history");
    Ok(versions)
}

/// Number of migrations embedded in this build
pub fn embedded_count() -> usize {
    sqlx::migrate!("./migrations").iter().count()
}
