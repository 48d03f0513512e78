use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    JobStatus, MatchCandidate, MatchEvent, MatchOutcome, Reservation, TruckStatus,
};
use crate::services::store::{EventStore, MarketplaceStore, StoreError};

/// Errors on the reservation path that are not protocol outcomes
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("dependency unavailable: {0}")]
    Dependency(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => LedgerError::NotFound(what),
            StoreError::Unavailable(what) => LedgerError::Dependency(what),
        }
    }
}

/// Result of a reservation attempt. Callers branch on these as normal
/// control flow; they are never surfaced as faults.
#[derive(Debug, Clone, PartialEq)]
pub enum ReserveOutcome {
    Reserved {
        token: Uuid,
        held_until: chrono::DateTime<Utc>,
    },
    /// Another caller holds a live reservation on this truck
    Busy,
    /// The truck's persisted status is not AVAILABLE
    NotAvailable,
    /// The job has already been matched or cancelled
    JobNotOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    Expired,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    Invalid,
}

#[derive(Default)]
struct TruckSlot {
    reservation: Option<Reservation>,
}

/// Tracks in-flight holds on trucks and serializes all reservation
/// transitions per truck id.
///
/// Each truck gets its own async mutex, so concurrent attempts on the
/// same truck are mutually exclusive while operations on different
/// trucks never contend. The ledger is the only writer of job/truck
/// status in the system.
pub struct ReservationLedger<S, E> {
    store: Arc<S>,
    events: Arc<E>,
    slots: DashMap<String, Arc<Mutex<TruckSlot>>>,
    tokens: DashMap<Uuid, String>,
}

impl<S: MarketplaceStore, E: EventStore> ReservationLedger<S, E> {
    pub fn new(store: Arc<S>, events: Arc<E>) -> Self {
        Self {
            store,
            events,
            slots: DashMap::new(),
            tokens: DashMap::new(),
        }
    }

    fn slot(&self, truck_id: &str) -> Arc<Mutex<TruckSlot>> {
        self.slots
            .entry(truck_id.to_string())
            .or_default()
            .clone()
    }

    /// Atomically place a hold on a truck for a job.
    ///
    /// Exactly one of N concurrent attempts on the same truck succeeds;
    /// the rest observe `Busy`. An expired hold found on access is
    /// released in place before the new attempt proceeds.
    pub async fn try_reserve(
        &self,
        truck_id: &str,
        job_id: &str,
        hold: Duration,
        candidate: &MatchCandidate,
    ) -> Result<ReserveOutcome, LedgerError> {
        let truck = self.store.fetch_truck(truck_id).await?;
        let job = self.store.fetch_job(job_id).await?;

        if job.status != JobStatus::Open {
            return Ok(ReserveOutcome::JobNotOpen);
        }

        let slot = self.slot(truck_id);
        let mut guard = slot.lock().await;
        let now = Utc::now();

        let mut cleared_expired = false;
        if let Some(existing) = &guard.reservation {
            if !existing.expired(now) {
                return Ok(ReserveOutcome::Busy);
            }
            let expired = existing.clone();
            guard.reservation = None;
            self.tokens.remove(&expired.token);
            self.log_event(expired.event(MatchOutcome::Expired)).await;
            cleared_expired = true;
        }

        match truck.status {
            TruckStatus::Available => {}
            // Persisted RESERVED left over from the hold we just expired
            TruckStatus::Reserved if cleared_expired => {}
            _ => return Ok(ReserveOutcome::NotAvailable),
        }

        let held_until = now
            + chrono::Duration::from_std(hold)
                .unwrap_or_else(|_| chrono::Duration::seconds(300));

        let reservation = Reservation {
            token: Uuid::new_v4(),
            truck_id: truck_id.to_string(),
            job_id: job_id.to_string(),
            shipper_id: job.shipper_id.clone(),
            carrier_id: truck.carrier_id.clone(),
            score: candidate.score,
            factors: candidate.breakdown.weighted_map(),
            cargo_type: job.cargo_type,
            origin: job.origin,
            held_until,
        };

        guard.reservation = Some(reservation.clone());

        if let Err(e) = self
            .store
            .persist_truck_status(truck_id, TruckStatus::Reserved)
            .await
        {
            guard.reservation = None;
            return Err(e.into());
        }

        self.tokens.insert(reservation.token, truck_id.to_string());
        self.log_event(reservation.event(MatchOutcome::Proposed)).await;

        tracing::info!(
            truck_id,
            job_id,
            token = %reservation.token,
            %held_until,
            "reserved truck for job"
        );

        Ok(ReserveOutcome::Reserved {
            token: reservation.token,
            held_until,
        })
    }

    /// Finalize a held match: job becomes MATCHED, the truck stays
    /// RESERVED, the hold is destroyed. Persistence runs before the
    /// hold is destroyed so a dependency failure leaves it retryable.
    pub async fn commit(&self, token: Uuid) -> Result<CommitOutcome, LedgerError> {
        let truck_id = match self.tokens.get(&token) {
            Some(entry) => entry.value().clone(),
            None => return Ok(CommitOutcome::Invalid),
        };

        let slot = self.slot(&truck_id);
        let mut guard = slot.lock().await;

        let reservation = match &guard.reservation {
            Some(r) if r.token == token => r.clone(),
            _ => {
                // Stale index entry from a hold already replaced
                self.tokens.remove(&token);
                return Ok(CommitOutcome::Invalid);
            }
        };

        if reservation.expired(Utc::now()) {
            self.store
                .persist_truck_status(&truck_id, TruckStatus::Available)
                .await?;
            guard.reservation = None;
            self.tokens.remove(&token);
            self.log_event(reservation.event(MatchOutcome::Expired)).await;
            tracing::info!(%truck_id, token = %token, "commit on expired hold, auto-released");
            return Ok(CommitOutcome::Expired);
        }

        // Holds for the same job on different trucks can coexist; the
        // job may have been matched through another truck since this
        // hold was placed. Re-check before persisting MATCHED so a job
        // transitions OPEN -> MATCHED at most once.
        let job = self.store.fetch_job(&reservation.job_id).await?;
        if job.status != JobStatus::Open {
            self.store
                .persist_truck_status(&truck_id, TruckStatus::Available)
                .await?;
            guard.reservation = None;
            self.tokens.remove(&token);
            self.log_event(reservation.event(MatchOutcome::Rejected)).await;
            tracing::info!(
                %truck_id,
                job_id = %reservation.job_id,
                token = %token,
                "commit refused, job no longer open"
            );
            return Ok(CommitOutcome::Invalid);
        }

        self.store
            .persist_job_status(&reservation.job_id, JobStatus::Matched)
            .await?;

        guard.reservation = None;
        self.tokens.remove(&token);
        self.log_event(reservation.event(MatchOutcome::Accepted)).await;

        tracing::info!(
            %truck_id,
            job_id = %reservation.job_id,
            token = %token,
            "match committed"
        );

        Ok(CommitOutcome::Committed)
    }

    /// Caller-initiated abandonment: truck reverts to AVAILABLE and the
    /// hold is destroyed
    pub async fn release(&self, token: Uuid) -> Result<ReleaseOutcome, LedgerError> {
        let truck_id = match self.tokens.get(&token) {
            Some(entry) => entry.value().clone(),
            None => return Ok(ReleaseOutcome::Invalid),
        };

        let slot = self.slot(&truck_id);
        let mut guard = slot.lock().await;

        let reservation = match &guard.reservation {
            Some(r) if r.token == token => r.clone(),
            _ => {
                self.tokens.remove(&token);
                return Ok(ReleaseOutcome::Invalid);
            }
        };

        self.store
            .persist_truck_status(&truck_id, TruckStatus::Available)
            .await?;

        guard.reservation = None;
        self.tokens.remove(&token);
        self.log_event(reservation.event(MatchOutcome::Rejected)).await;

        tracing::info!(%truck_id, token = %token, "reservation released");

        Ok(ReleaseOutcome::Released)
    }

    /// Release every hold whose `held_until` has elapsed. Takes the same
    /// per-truck mutex as live requests, so it never races a commit.
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let slots: Vec<(String, Arc<Mutex<TruckSlot>>)> = self
            .slots
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut released = 0;
        for (truck_id, slot) in slots {
            let mut guard = slot.lock().await;
            let reservation = match &guard.reservation {
                Some(r) if r.expired(now) => r.clone(),
                _ => continue,
            };

            if let Err(e) = self
                .store
                .persist_truck_status(&truck_id, TruckStatus::Available)
                .await
            {
                // Hold stays in place and is retried on the next sweep
                tracing::error!(%truck_id, "failed to revert expired hold: {}", e);
                continue;
            }

            guard.reservation = None;
            self.tokens.remove(&reservation.token);
            self.log_event(reservation.event(MatchOutcome::Expired)).await;
            released += 1;
        }

        if released > 0 {
            tracing::info!(released, "swept expired reservations");
        }

        released
    }

    /// Cooperative background expiry loop
    pub async fn run_sweeper(self: Arc<Self>, every: Duration) {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.sweep().await;
        }
    }

    /// Live (non-expired) reservation on a truck, if any
    pub async fn active_reservation(&self, truck_id: &str) -> Option<Reservation> {
        let slot = self.slots.get(truck_id)?.value().clone();
        let guard = slot.lock().await;
        guard
            .reservation
            .clone()
            .filter(|r| !r.expired(Utc::now()))
    }

    async fn log_event(&self, event: MatchEvent) {
        // History is best-effort on this path; a failed append must not
        // roll back a completed state transition
        if let Err(e) = self.events.append_event(&event).await {
            tracing::warn!(
                job_id = %event.job_id,
                truck_id = %event.truck_id,
                outcome = event.outcome.as_str(),
                "failed to append match event: {}",
                e
            );
        }
    }
}
