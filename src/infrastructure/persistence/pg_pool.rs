use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{info, instrument, warn};

use crate::application::ports::RepositoryError;

const CONNECT_ATTEMPTS: u32 = 6;

#[instrument(skip(url))]
pub async fn create_pool(url: &str, max_connections: u32) -> Result<PgPool, RepositoryError> {
    let mut delay = Duration::from_millis(500);

    for attempt in 1..=CONNECT_ATTEMPTS {
        match PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
        {
            Ok(pool) => {
                info!(attempt, "PostgreSQL connection pool established");
                return Ok(pool);
            }
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                warn!(
                    error = %e,
                    retries_left = CONNECT_ATTEMPTS - attempt,
                    delay_ms = delay.as_millis(),
                    "PostgreSQL connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_secs(8));
            }
            Err(e) => return Err(RepositoryError::ConnectionFailed(e.to_string())),
        }
    }
    Err(RepositoryError::ConnectionFailed(
        "no connection attempts made".to_string(),
    ))
}

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), RepositoryError> {
    info!("Running database migrations");
    sqlx::migrate!()
        .run(pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
    info!("Migrations complete");
    Ok(())
}
