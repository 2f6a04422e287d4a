use crate::errors::Result;
use crate::metrics::PERSIST_LATENCY_SECONDS;
use crate::model::{HealthReport, RawReading, StatusEvent};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Builds the shared connection pool and runs schema migrations.
///
/// The pool is constructed once at startup and passed explicitly to the
/// pipeline; the bounded acquire timeout keeps a stuck store from
/// stalling message handling indefinitely.
pub async fn make_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}

/// Commits a raw reading together with its derived status event as one
/// transaction. Both rows land or neither does; dropping the transaction
/// on an error path rolls it back and releases the connection.
pub async fn insert_reading(
    pool: &PgPool,
    reading: &RawReading,
    event: &StatusEvent,
) -> Result<()> {
    let start = Instant::now();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO traffic_raw (device_id, ts, street_id, vehicle_count, congestion_level)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&reading.device_id)
    .bind(reading.timestamp)
    .bind(&reading.street_id)
    .bind(reading.vehicle_count)
    .bind(&reading.congestion_level)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO traffic_status (device_id, ts, street_id, congestion_level)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&event.device_id)
    .bind(event.timestamp)
    .bind(&event.street_id)
    .bind(&event.congestion_level)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    PERSIST_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());

    Ok(())
}

/// Commits one device health report.
pub async fn insert_health(pool: &PgPool, report: &HealthReport) -> Result<()> {
    let start = Instant::now();

    sqlx::query(
        r#"
        INSERT INTO device_health (device_id, ts, status, uptime_s)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&report.device_id)
    .bind(report.timestamp)
    .bind(&report.status)
    .bind(report.uptime_s)
    .execute(pool)
    .await?;

    PERSIST_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());

    Ok(())
}
