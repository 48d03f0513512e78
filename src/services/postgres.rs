use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use thiserror::Error;

use crate::models::{CargoType, GeoPoint, MatchEvent, MatchOutcome, TimeWindow};
use crate::services::store::{EventStore, StoreError};

/// Upper bound on rows returned by history queries
const HISTORY_LIMIT: i64 = 500;

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

impl From<PostgresError> for StoreError {
    fn from(err: PostgresError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// PostgreSQL-backed match-event history
///
/// The event log lives in its own database, separate from the CRUD
/// backend that owns job and truck records. It is append-only: rows
/// are never updated or deleted by the matching service.
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Connect and run migrations on startup
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL event store");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
        )
        .await
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    fn row_to_event(row: &PgRow) -> Result<MatchEvent, PostgresError> {
        let outcome_raw: String = row.get("outcome");
        let outcome = MatchOutcome::parse(&outcome_raw)
            .ok_or_else(|| PostgresError::InvalidRow(format!("unknown outcome {}", outcome_raw)))?;

        let cargo_type: Option<CargoType> = row
            .get::<Option<String>, _>("cargo_type")
            .and_then(|s| serde_json::from_value(serde_json::Value::String(s)).ok());

        let origin = match (
            row.get::<Option<f64>, _>("origin_lat"),
            row.get::<Option<f64>, _>("origin_lon"),
        ) {
            (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
            _ => None,
        };

        let factors: HashMap<String, f64> =
            serde_json::from_value(row.get::<serde_json::Value, _>("factors"))
                .map_err(|e| PostgresError::InvalidRow(format!("bad factors: {}", e)))?;

        Ok(MatchEvent {
            id: row.get("id"),
            job_id: row.get("job_id"),
            truck_id: row.get("truck_id"),
            shipper_id: row.get("shipper_id"),
            carrier_id: row.get("carrier_id"),
            score: row.get("score"),
            outcome,
            cargo_type,
            origin,
            factors,
            occurred_at: row.get("occurred_at"),
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append_event(&self, event: &MatchEvent) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO match_events (
                id, job_id, truck_id, shipper_id, carrier_id,
                score, outcome, cargo_type, origin_lat, origin_lon,
                factors, occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#;

        let factors = serde_json::to_value(&event.factors)
            .map_err(|e| StoreError::Unavailable(format!("unserializable factors: {}", e)))?;

        sqlx::query(query)
            .bind(event.id)
            .bind(&event.job_id)
            .bind(&event.truck_id)
            .bind(&event.shipper_id)
            .bind(&event.carrier_id)
            .bind(event.score)
            .bind(event.outcome.as_str())
            .bind(event.cargo_type.map(|c| c.as_str()))
            .bind(event.origin.map(|o| o.lat))
            .bind(event.origin.map(|o| o.lon))
            .bind(factors)
            .bind(event.occurred_at)
            .execute(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        tracing::debug!(
            job_id = %event.job_id,
            truck_id = %event.truck_id,
            outcome = event.outcome.as_str(),
            "appended match event"
        );

        Ok(())
    }

    async fn events_between(&self, window: &TimeWindow) -> Result<Vec<MatchEvent>, StoreError> {
        let query = r#"
            SELECT id, job_id, truck_id, shipper_id, carrier_id,
                   score, outcome, cargo_type, origin_lat, origin_lon,
                   factors, occurred_at
            FROM match_events
            WHERE occurred_at >= $1 AND occurred_at <= $2
            ORDER BY occurred_at ASC
        "#;

        let rows = sqlx::query(query)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        rows.iter()
            .map(|row| Self::row_to_event(row).map_err(Into::into))
            .collect()
    }

    async fn actor_history(&self, actor_id: &str) -> Result<Vec<MatchEvent>, StoreError> {
        let query = r#"
            SELECT id, job_id, truck_id, shipper_id, carrier_id,
                   score, outcome, cargo_type, origin_lat, origin_lon,
                   factors, occurred_at
            FROM match_events
            WHERE shipper_id = $1 OR carrier_id = $1
            ORDER BY occurred_at DESC
            LIMIT $2
        "#;

        let rows = sqlx::query(query)
            .bind(actor_id)
            .bind(HISTORY_LIMIT)
            .fetch_all(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        rows.iter()
            .map(|row| Self::row_to_event(row).map_err(Into::into))
            .collect()
    }
}
