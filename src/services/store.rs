use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    ActorRole, CandidateFilter, CarrierStats, Job, JobStatus, MatchEvent, TimeWindow, Truck,
    TruckStatus,
};

/// Failure taxonomy shared by all external collaborators.
///
/// `NotFound` is reported per-id inside partial results; `Unavailable`
/// fails the enclosing request with a retryable error and never touches
/// reservation state.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("dependency unavailable: {0}")]
    Unavailable(String),
}

/// Query interface onto the external CRUD/persistence layer that owns
/// job and truck records
#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    async fn fetch_job(&self, id: &str) -> Result<Job, StoreError>;

    async fn fetch_truck(&self, id: &str) -> Result<Truck, StoreError>;

    async fn query_open_jobs(&self, filter: &CandidateFilter) -> Result<Vec<Job>, StoreError>;

    async fn query_available_trucks(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<Truck>, StoreError>;

    async fn persist_job_status(&self, id: &str, status: JobStatus) -> Result<(), StoreError>;

    async fn persist_truck_status(&self, id: &str, status: TruckStatus) -> Result<(), StoreError>;

    /// Historical pricing/reliability data; `None` when the carrier has
    /// no usable history yet
    async fn carrier_stats(&self, carrier_id: &str) -> Result<Option<CarrierStats>, StoreError>;

    async fn actor_role(&self, actor_id: &str) -> Result<ActorRole, StoreError>;
}

/// Append-only match-event history
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append_event(&self, event: &MatchEvent) -> Result<(), StoreError>;

    /// Events whose `occurred_at` falls inside the window, oldest first
    async fn events_between(&self, window: &TimeWindow) -> Result<Vec<MatchEvent>, StoreError>;

    /// Events involving the actor as shipper or carrier, newest first
    async fn actor_history(&self, actor_id: &str) -> Result<Vec<MatchEvent>, StoreError>;
}
