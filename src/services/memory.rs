use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::models::{
    ActorRole, CandidateFilter, CarrierStats, Job, JobStatus, MatchEvent, TimeWindow, Truck,
    TruckStatus,
};
use crate::services::store::{EventStore, MarketplaceStore, StoreError};

/// In-memory marketplace data, used by the test suites and for
/// embedding the engine without the CRUD backend.
///
/// `set_online(false)` makes every call fail with `Unavailable`, which
/// is how dependency-outage behavior is exercised.
#[derive(Default)]
pub struct InMemoryMarketplace {
    jobs: RwLock<HashMap<String, Job>>,
    trucks: RwLock<HashMap<String, Truck>>,
    stats: RwLock<HashMap<String, CarrierStats>>,
    roles: RwLock<HashMap<String, ActorRole>>,
    online: AtomicBool,
}

impl InMemoryMarketplace {
    pub fn new() -> Self {
        let store = Self::default();
        store.online.store(true, Ordering::SeqCst);
        store
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn insert_job(&self, job: Job) {
        self.jobs
            .write()
            .expect("job map poisoned")
            .insert(job.id.clone(), job);
    }

    pub fn insert_truck(&self, truck: Truck) {
        self.trucks
            .write()
            .expect("truck map poisoned")
            .insert(truck.id.clone(), truck);
    }

    pub fn insert_stats(&self, carrier_id: &str, stats: CarrierStats) {
        self.stats
            .write()
            .expect("stats map poisoned")
            .insert(carrier_id.to_string(), stats);
    }

    pub fn insert_role(&self, actor_id: &str, role: ActorRole) {
        self.roles
            .write()
            .expect("role map poisoned")
            .insert(actor_id.to_string(), role);
    }

    pub fn job(&self, id: &str) -> Option<Job> {
        self.jobs.read().expect("job map poisoned").get(id).cloned()
    }

    pub fn truck(&self, id: &str) -> Option<Truck> {
        self.trucks
            .read()
            .expect("truck map poisoned")
            .get(id)
            .cloned()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("marketplace store offline".into()))
        }
    }
}

#[async_trait]
impl MarketplaceStore for InMemoryMarketplace {
    async fn fetch_job(&self, id: &str) -> Result<Job, StoreError> {
        self.check_online()?;
        self.job(id)
            .ok_or_else(|| StoreError::NotFound(format!("job {}", id)))
    }

    async fn fetch_truck(&self, id: &str) -> Result<Truck, StoreError> {
        self.check_online()?;
        self.truck(id)
            .ok_or_else(|| StoreError::NotFound(format!("truck {}", id)))
    }

    async fn query_open_jobs(&self, filter: &CandidateFilter) -> Result<Vec<Job>, StoreError> {
        self.check_online()?;
        let jobs = self.jobs.read().expect("job map poisoned");
        let mut matched: Vec<Job> = jobs
            .values()
            .filter(|j| j.status == JobStatus::Open)
            .filter(|j| filter.cargo_type.map_or(true, |c| j.cargo_type == c))
            .filter(|j| {
                filter
                    .shipper_id
                    .as_deref()
                    .map_or(true, |s| j.shipper_id == s)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn query_available_trucks(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<Truck>, StoreError> {
        self.check_online()?;
        let trucks = self.trucks.read().expect("truck map poisoned");
        let mut matched: Vec<Truck> = trucks
            .values()
            .filter(|t| t.status == TruckStatus::Available)
            .filter(|t| filter.cargo_type.map_or(true, |c| t.supports(c)))
            .filter(|t| {
                filter
                    .carrier_id
                    .as_deref()
                    .map_or(true, |c| t.carrier_id == c)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn persist_job_status(&self, id: &str, status: JobStatus) -> Result<(), StoreError> {
        self.check_online()?;
        let mut jobs = self.jobs.write().expect("job map poisoned");
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("job {}", id)))?;
        job.status = status;
        Ok(())
    }

    async fn persist_truck_status(&self, id: &str, status: TruckStatus) -> Result<(), StoreError> {
        self.check_online()?;
        let mut trucks = self.trucks.write().expect("truck map poisoned");
        let truck = trucks
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("truck {}", id)))?;
        truck.status = status;
        Ok(())
    }

    async fn carrier_stats(&self, carrier_id: &str) -> Result<Option<CarrierStats>, StoreError> {
        self.check_online()?;
        Ok(self
            .stats
            .read()
            .expect("stats map poisoned")
            .get(carrier_id)
            .cloned())
    }

    async fn actor_role(&self, actor_id: &str) -> Result<ActorRole, StoreError> {
        self.check_online()?;
        self.roles
            .read()
            .expect("role map poisoned")
            .get(actor_id)
            .copied()
            .ok_or_else(|| StoreError::NotFound(format!("actor {}", actor_id)))
    }
}

/// In-memory append-only event log
#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<MatchEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<MatchEvent> {
        self.events.read().expect("event log poisoned").clone()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append_event(&self, event: &MatchEvent) -> Result<(), StoreError> {
        self.events
            .write()
            .expect("event log poisoned")
            .push(event.clone());
        Ok(())
    }

    async fn events_between(&self, window: &TimeWindow) -> Result<Vec<MatchEvent>, StoreError> {
        let events = self.events.read().expect("event log poisoned");
        let mut matched: Vec<MatchEvent> = events
            .iter()
            .filter(|e| e.occurred_at >= window.start && e.occurred_at <= window.end)
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.occurred_at);
        Ok(matched)
    }

    async fn actor_history(&self, actor_id: &str) -> Result<Vec<MatchEvent>, StoreError> {
        let events = self.events.read().expect("event log poisoned");
        let mut matched: Vec<MatchEvent> = events
            .iter()
            .filter(|e| e.shipper_id == actor_id || e.carrier_id == actor_id)
            .cloned()
            .collect();
        matched.sort_by_key(|e| std::cmp::Reverse(e.occurred_at));
        Ok(matched)
    }
}
