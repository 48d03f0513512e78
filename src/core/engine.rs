use std::collections::HashMap;
use std::sync::Arc;

use crate::core::distance::haversine_km;
use crate::core::feasibility::Infeasibility;
use crate::core::ranker::rank;
use crate::core::scoring::{build_candidate, score_pair, FACTOR_PERSONALIZATION};
use crate::core::MatchError;
use crate::models::{
    ActorRole, CandidateFilter, CarrierStats, FactorContribution, Job, JobStatus, MatchCandidate,
    MatchEvent, MatchGroup, MatchOutcome, MatchParams, MatchWeights, Truck, TruckStatus,
};
use crate::services::store::{EventStore, MarketplaceStore, StoreError};

/// Largest relative boost personalization may add to a base score
const MAX_PERSONALIZATION_BOOST: f64 = 0.15;

/// Radius within which a historical origin counts toward route affinity
const AFFINITY_RADIUS_KM: f64 = 150.0;

const CARGO_AFFINITY_WEIGHT: f64 = 0.6;
const ROUTE_AFFINITY_WEIGHT: f64 = 0.4;

/// Outcome of assessing a single (job, truck) pair
#[derive(Debug, Clone)]
pub enum PairAssessment {
    Scored(MatchCandidate),
    Infeasible(Infeasibility),
}

/// Read-side matching facade: batch job/truck matching and personalized
/// recommendations. Stateless between requests; all data comes from the
/// marketplace store and the event history.
pub struct RecommendationEngine<S, E> {
    store: Arc<S>,
    events: Arc<E>,
    max_useful_distance_km: f64,
}

impl<S: MarketplaceStore, E: EventStore> RecommendationEngine<S, E> {
    pub fn new(store: Arc<S>, events: Arc<E>, max_useful_distance_km: f64) -> Self {
        Self {
            store,
            events,
            max_useful_distance_km,
        }
    }

    /// Rank available trucks for each requested job.
    ///
    /// Per-id failures (unknown job, job no longer open) degrade to a
    /// failed group inside the batch; a store outage fails the whole
    /// request.
    pub async fn match_jobs_to_trucks(
        &self,
        job_ids: &[String],
        params: &MatchParams,
    ) -> Result<Vec<MatchGroup>, MatchError> {
        params.validate().map_err(MatchError::Validation)?;
        let weights = params.weights();

        let trucks = self
            .store
            .query_available_trucks(&CandidateFilter::default())
            .await
            .map_err(dependency)?;

        let mut stats_cache: HashMap<String, Option<CarrierStats>> = HashMap::new();
        let mut results = Vec::with_capacity(job_ids.len());

        for job_id in job_ids {
            let job = match self.store.fetch_job(job_id).await {
                Ok(job) => job,
                Err(StoreError::NotFound(_)) => {
                    results.push(MatchGroup::failed(job_id, "job not found"));
                    continue;
                }
                Err(StoreError::Unavailable(what)) => return Err(MatchError::Dependency(what)),
            };

            if job.status != JobStatus::Open {
                results.push(MatchGroup::failed(
                    job_id,
                    format!("job is {}", job.status.as_str()),
                ));
                continue;
            }

            let candidates = self
                .score_against_trucks(&job, &trucks, &weights, &mut stats_cache)
                .await?;
            let ranking = rank(candidates, params.max_candidates)?;
            results.push(MatchGroup::ranked(job_id, ranking.into_top()));
        }

        Ok(results)
    }

    /// Rank open jobs for each requested truck; the mirror of
    /// `match_jobs_to_trucks` with the same partial-failure semantics
    pub async fn match_trucks_to_jobs(
        &self,
        truck_ids: &[String],
        params: &MatchParams,
    ) -> Result<Vec<MatchGroup>, MatchError> {
        params.validate().map_err(MatchError::Validation)?;
        let weights = params.weights();

        let jobs = self
            .store
            .query_open_jobs(&CandidateFilter::default())
            .await
            .map_err(dependency)?;

        let mut stats_cache: HashMap<String, Option<CarrierStats>> = HashMap::new();
        let mut results = Vec::with_capacity(truck_ids.len());

        for truck_id in truck_ids {
            let truck = match self.store.fetch_truck(truck_id).await {
                Ok(truck) => truck,
                Err(StoreError::NotFound(_)) => {
                    results.push(MatchGroup::failed(truck_id, "truck not found"));
                    continue;
                }
                Err(StoreError::Unavailable(what)) => return Err(MatchError::Dependency(what)),
            };

            if truck.status != TruckStatus::Available {
                results.push(MatchGroup::failed(
                    truck_id,
                    format!("truck is {}", truck.status.as_str()),
                ));
                continue;
            }

            let stats = self
                .stats_for(&truck.carrier_id, &mut stats_cache)
                .await?;
            let mut candidates = Vec::new();
            for job in &jobs {
                match score_pair(
                    job,
                    &truck,
                    stats.as_ref(),
                    &weights,
                    self.max_useful_distance_km,
                ) {
                    Ok((score, breakdown)) => {
                        candidates.push(build_candidate(job, &truck, score, breakdown));
                    }
                    Err(reason) => {
                        tracing::debug!(job_id = %job.id, truck_id = %truck.id, %reason, "pair filtered");
                    }
                }
            }

            let ranking = rank(candidates, params.max_candidates)?;
            results.push(MatchGroup::ranked(truck_id, ranking.into_top()));
        }

        Ok(results)
    }

    /// Score one explicit pair, used by the reservation path to capture
    /// the score and breakdown at hold time
    pub async fn assess_pair(
        &self,
        job_id: &str,
        truck_id: &str,
        params: &MatchParams,
    ) -> Result<PairAssessment, MatchError> {
        params.validate().map_err(MatchError::Validation)?;

        let job = self.store.fetch_job(job_id).await.map_err(not_found)?;
        let truck = self.store.fetch_truck(truck_id).await.map_err(not_found)?;
        let stats = self
            .store
            .carrier_stats(&truck.carrier_id)
            .await
            .map_err(dependency)?;

        match score_pair(
            &job,
            &truck,
            stats.as_ref(),
            &params.weights(),
            self.max_useful_distance_km,
        ) {
            Ok((score, breakdown)) => Ok(PairAssessment::Scored(build_candidate(
                &job, &truck, score, breakdown,
            ))),
            Err(reason) => Ok(PairAssessment::Infeasible(reason)),
        }
    }

    /// Top matches for an actor, boosted by their acceptance history.
    ///
    /// Shippers see trucks ranked against their own open jobs; carriers
    /// see jobs ranked against their own available trucks. The boost is
    /// bounded, so a poor base match never overtakes a strong one on
    /// history alone.
    pub async fn recommendations(
        &self,
        actor_id: &str,
        limit: usize,
    ) -> Result<(ActorRole, Vec<MatchCandidate>), MatchError> {
        if limit < 1 {
            return Err(MatchError::Validation("limit must be >= 1".to_string()));
        }

        let role = self.store.actor_role(actor_id).await.map_err(not_found)?;
        let history = self
            .events
            .actor_history(actor_id)
            .await
            .map_err(dependency)?;
        let accepted: Vec<&MatchEvent> = history
            .iter()
            .filter(|e| e.outcome == MatchOutcome::Accepted)
            .collect();

        let weights = MatchWeights::default();
        let mut stats_cache: HashMap<String, Option<CarrierStats>> = HashMap::new();
        let mut all: Vec<MatchCandidate> = Vec::new();

        match role {
            ActorRole::Shipper => {
                let jobs = self
                    .store
                    .query_open_jobs(&CandidateFilter {
                        shipper_id: Some(actor_id.to_string()),
                        ..CandidateFilter::default()
                    })
                    .await
                    .map_err(dependency)?;
                let trucks = self
                    .store
                    .query_available_trucks(&CandidateFilter::default())
                    .await
                    .map_err(dependency)?;

                for job in &jobs {
                    let mut candidates = self
                        .score_against_trucks(job, &trucks, &weights, &mut stats_cache)
                        .await?;
                    for candidate in &mut candidates {
                        apply_personalization(candidate, job, &accepted);
                    }
                    all.extend(candidates);
                }
            }
            ActorRole::Carrier => {
                let trucks = self
                    .store
                    .query_available_trucks(&CandidateFilter {
                        carrier_id: Some(actor_id.to_string()),
                        ..CandidateFilter::default()
                    })
                    .await
                    .map_err(dependency)?;
                let jobs = self
                    .store
                    .query_open_jobs(&CandidateFilter::default())
                    .await
                    .map_err(dependency)?;

                for truck in &trucks {
                    let stats = self
                        .stats_for(&truck.carrier_id, &mut stats_cache)
                        .await?;
                    for job in &jobs {
                        match score_pair(
                            job,
                            truck,
                            stats.as_ref(),
                            &weights,
                            self.max_useful_distance_km,
                        ) {
                            Ok((score, breakdown)) => {
                                let mut candidate = build_candidate(job, truck, score, breakdown);
                                apply_personalization(&mut candidate, job, &accepted);
                                all.push(candidate);
                            }
                            Err(reason) => {
                                tracing::debug!(
                                    job_id = %job.id,
                                    truck_id = %truck.id,
                                    %reason,
                                    "pair filtered"
                                );
                            }
                        }
                    }
                }
            }
        }

        let ranking = rank(all, limit)?;
        Ok((role, ranking.into_top()))
    }

    async fn score_against_trucks(
        &self,
        job: &Job,
        trucks: &[Truck],
        weights: &MatchWeights,
        stats_cache: &mut HashMap<String, Option<CarrierStats>>,
    ) -> Result<Vec<MatchCandidate>, MatchError> {
        let mut candidates = Vec::new();
        for truck in trucks {
            let stats = self.stats_for(&truck.carrier_id, stats_cache).await?;
            match score_pair(job, truck, stats.as_ref(), weights, self.max_useful_distance_km) {
                Ok((score, breakdown)) => {
                    candidates.push(build_candidate(job, truck, score, breakdown));
                }
                Err(reason) => {
                    tracing::debug!(job_id = %job.id, truck_id = %truck.id, %reason, "pair filtered");
                }
            }
        }
        Ok(candidates)
    }

    async fn stats_for(
        &self,
        carrier_id: &str,
        cache: &mut HashMap<String, Option<CarrierStats>>,
    ) -> Result<Option<CarrierStats>, MatchError> {
        if let Some(stats) = cache.get(carrier_id) {
            return Ok(stats.clone());
        }
        let stats = self
            .store
            .carrier_stats(carrier_id)
            .await
            .map_err(dependency)?;
        cache.insert(carrier_id.to_string(), stats.clone());
        Ok(stats)
    }
}

fn dependency(err: StoreError) -> MatchError {
    MatchError::Dependency(err.to_string())
}

fn not_found(err: StoreError) -> MatchError {
    match err {
        StoreError::NotFound(what) => MatchError::NotFound(what),
        StoreError::Unavailable(what) => MatchError::Dependency(what),
    }
}

/// Affinity in [0, 1] between a job and the actor's accepted matches:
/// the share of history on the same cargo type, blended with the share
/// whose origin lies near this job's origin
fn personal_affinity(accepted: &[&MatchEvent], job: &Job) -> f64 {
    if accepted.is_empty() {
        return 0.0;
    }
    let total = accepted.len() as f64;

    let cargo_share = accepted
        .iter()
        .filter(|e| e.cargo_type == Some(job.cargo_type))
        .count() as f64
        / total;

    let route_share = accepted
        .iter()
        .filter(|e| {
            e.origin
                .map(|origin| haversine_km(origin, job.origin) <= AFFINITY_RADIUS_KM)
                .unwrap_or(false)
        })
        .count() as f64
        / total;

    CARGO_AFFINITY_WEIGHT * cargo_share + ROUTE_AFFINITY_WEIGHT * route_share
}

fn apply_personalization(candidate: &mut MatchCandidate, job: &Job, accepted: &[&MatchEvent]) {
    let affinity = personal_affinity(accepted, job);
    if affinity <= 0.0 {
        return;
    }

    let boosted = (candidate.score * (1.0 + MAX_PERSONALIZATION_BOOST * affinity)).min(100.0);
    let delta = boosted - candidate.score;
    candidate.breakdown.factors.push(FactorContribution {
        factor: FACTOR_PERSONALIZATION.to_string(),
        raw: affinity,
        weight: MAX_PERSONALIZATION_BOOST,
        weighted: delta / 100.0,
    });
    candidate.score = boosted;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CargoType, GeoPoint, PriceRange, TimeWindow};
    use crate::services::memory::{InMemoryEventStore, InMemoryMarketplace};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use uuid::Uuid;

    const MAX_DISTANCE_KM: f64 = 500.0;

    fn window(start_h: u32, end_h: u32) -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 6, 1, start_h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 1, end_h, 0, 0).unwrap(),
        )
    }

    fn casablanca() -> GeoPoint {
        GeoPoint {
            lat: 33.5731,
            lon: -7.5898,
        }
    }

    fn rabat() -> GeoPoint {
        GeoPoint {
            lat: 34.0209,
            lon: -6.8416,
        }
    }

    fn job(id: &str, shipper_id: &str, cargo: CargoType) -> Job {
        Job {
            id: id.to_string(),
            shipper_id: shipper_id.to_string(),
            origin: casablanca(),
            destination: rabat(),
            weight_kg: 1000.0,
            volume_m3: 10.0,
            cargo_type: cargo,
            pickup_window: window(9, 12),
            offered_price: 4500.0,
            status: JobStatus::Open,
        }
    }

    fn truck(id: &str, carrier_id: &str, location: GeoPoint) -> Truck {
        Truck {
            id: id.to_string(),
            carrier_id: carrier_id.to_string(),
            capacity_kg: 2000.0,
            capacity_m3: 20.0,
            supported_cargo: vec![CargoType::General, CargoType::Perishable],
            location,
            availability: window(8, 13),
            status: TruckStatus::Available,
        }
    }

    fn engine(
        store: Arc<InMemoryMarketplace>,
        events: Arc<InMemoryEventStore>,
    ) -> RecommendationEngine<InMemoryMarketplace, InMemoryEventStore> {
        RecommendationEngine::new(store, events, MAX_DISTANCE_KM)
    }

    fn accepted_event(actor: &str, cargo: CargoType, origin: GeoPoint) -> MatchEvent {
        MatchEvent {
            id: Uuid::new_v4(),
            job_id: "hist-job".to_string(),
            truck_id: "hist-truck".to_string(),
            shipper_id: actor.to_string(),
            carrier_id: "other".to_string(),
            score: 80.0,
            outcome: MatchOutcome::Accepted,
            cargo_type: Some(cargo),
            origin: Some(origin),
            factors: HashMap::new(),
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_batch_ranks_trucks_per_job() {
        let store = Arc::new(InMemoryMarketplace::new());
        store.insert_job(job("J1", "S1", CargoType::Perishable));
        store.insert_truck(truck("T1", "C1", casablanca()));
        // Distant truck, still feasible but lower proximity
        store.insert_truck(truck(
            "T2",
            "C2",
            GeoPoint {
                lat: 35.7595,
                lon: -5.8340,
            },
        ));

        let engine = engine(store, Arc::new(InMemoryEventStore::new()));
        let groups = engine
            .match_jobs_to_trucks(&["J1".to_string()], &MatchParams::default())
            .await
            .unwrap();

        assert_eq!(groups.len(), 1);
        let matches = &groups[0].matches;
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].truck_id, "T1");
        assert!(matches[0].score > matches[1].score);
    }

    #[tokio::test]
    async fn test_unknown_job_degrades_to_failed_group() {
        let store = Arc::new(InMemoryMarketplace::new());
        store.insert_job(job("J1", "S1", CargoType::General));
        store.insert_truck(truck("T1", "C1", casablanca()));

        let engine = engine(store, Arc::new(InMemoryEventStore::new()));
        let groups = engine
            .match_jobs_to_trucks(
                &["J1".to_string(), "missing".to_string()],
                &MatchParams::default(),
            )
            .await
            .unwrap();

        assert_eq!(groups.len(), 2);
        assert!(groups[0].error.is_none());
        assert!(groups[1].error.is_some());
        assert!(groups[1].matches.is_empty());
    }

    #[tokio::test]
    async fn test_non_open_job_degrades_to_failed_group() {
        let store = Arc::new(InMemoryMarketplace::new());
        let mut matched = job("J1", "S1", CargoType::General);
        matched.status = JobStatus::Matched;
        store.insert_job(matched);

        let engine = engine(store, Arc::new(InMemoryEventStore::new()));
        let groups = engine
            .match_jobs_to_trucks(&["J1".to_string()], &MatchParams::default())
            .await
            .unwrap();

        assert_eq!(groups[0].error.as_deref(), Some("job is MATCHED"));
    }

    #[tokio::test]
    async fn test_store_outage_fails_whole_request() {
        let store = Arc::new(InMemoryMarketplace::new());
        store.set_online(false);

        let engine = engine(store, Arc::new(InMemoryEventStore::new()));
        let result = engine
            .match_jobs_to_trucks(&["J1".to_string()], &MatchParams::default())
            .await;

        assert!(matches!(result, Err(MatchError::Dependency(_))));
    }

    #[tokio::test]
    async fn test_invalid_weights_rejected_before_any_fetch() {
        let store = Arc::new(InMemoryMarketplace::new());
        store.set_online(false);

        let engine = engine(store, Arc::new(InMemoryEventStore::new()));
        let params = MatchParams {
            proximity_weight: 0.9,
            ..MatchParams::default()
        };
        let result = engine
            .match_jobs_to_trucks(&["J1".to_string()], &params)
            .await;

        // Validation wins over the (offline) store
        assert!(matches!(result, Err(MatchError::Validation(_))));
    }

    #[tokio::test]
    async fn test_trucks_to_jobs_mirrors_batch_semantics() {
        let store = Arc::new(InMemoryMarketplace::new());
        store.insert_job(job("J1", "S1", CargoType::Perishable));
        store.insert_job(job("J2", "S2", CargoType::General));
        store.insert_truck(truck("T1", "C1", casablanca()));

        let engine = engine(store, Arc::new(InMemoryEventStore::new()));
        let groups = engine
            .match_trucks_to_jobs(&["T1".to_string()], &MatchParams::default())
            .await
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].matches.len(), 2);
    }

    #[tokio::test]
    async fn test_assess_pair_reports_infeasibility_without_failing() {
        let store = Arc::new(InMemoryMarketplace::new());
        let mut heavy = job("J1", "S1", CargoType::General);
        heavy.weight_kg = 5000.0;
        store.insert_job(heavy);
        store.insert_truck(truck("T1", "C1", casablanca()));

        let engine = engine(store, Arc::new(InMemoryEventStore::new()));
        let assessment = engine
            .assess_pair("J1", "T1", &MatchParams::default())
            .await
            .unwrap();

        assert!(matches!(assessment, PairAssessment::Infeasible(_)));
    }

    #[tokio::test]
    async fn test_recommendations_boost_reorders_on_history() {
        let store = Arc::new(InMemoryMarketplace::new());
        store.insert_role("S1", ActorRole::Shipper);
        store.insert_job(job("J1", "S1", CargoType::Perishable));
        store.insert_truck(truck("T1", "C1", casablanca()));
        store.insert_truck(truck("T2", "C2", casablanca()));
        // C2 has weak history, dragging its base score below C1's
        let mut weak = crate::models::CarrierStats::default();
        weak.on_time_rate = Some(0.4);
        store.insert_stats("C2", weak);
        let mut strong = crate::models::CarrierStats::default();
        strong.on_time_rate = Some(0.9);
        strong.price_ranges.insert(
            CargoType::Perishable,
            PriceRange {
                min: 4000.0,
                max: 6000.0,
            },
        );
        store.insert_stats("C1", strong);

        let events = Arc::new(InMemoryEventStore::new());
        let event = accepted_event("S1", CargoType::Perishable, casablanca());
        events.append_event(&event).await.unwrap();

        let engine = engine(store, events);
        let (role, matches) = engine.recommendations("S1", 5).await.unwrap();

        assert_eq!(role, ActorRole::Shipper);
        assert_eq!(matches.len(), 2);
        // Boost applies to both candidates for the same job; breakdown
        // carries the personalization factor
        for candidate in &matches {
            assert!(candidate
                .breakdown
                .factors
                .iter()
                .any(|f| f.factor == FACTOR_PERSONALIZATION));
            assert!(candidate.score <= 100.0);
        }
        assert_eq!(matches[0].truck_id, "T1");
    }

    #[tokio::test]
    async fn test_recommendations_without_history_have_no_boost_factor() {
        let store = Arc::new(InMemoryMarketplace::new());
        store.insert_role("S1", ActorRole::Shipper);
        store.insert_job(job("J1", "S1", CargoType::General));
        store.insert_truck(truck("T1", "C1", casablanca()));

        let engine = engine(store, Arc::new(InMemoryEventStore::new()));
        let (_, matches) = engine.recommendations("S1", 5).await.unwrap();

        assert_eq!(matches.len(), 1);
        assert!(!matches[0]
            .breakdown
            .factors
            .iter()
            .any(|f| f.factor == FACTOR_PERSONALIZATION));
    }

    #[tokio::test]
    async fn test_recommendations_unknown_actor_is_not_found() {
        let store = Arc::new(InMemoryMarketplace::new());
        let engine = engine(store, Arc::new(InMemoryEventStore::new()));

        let result = engine.recommendations("ghost", 5).await;
        assert!(matches!(result, Err(MatchError::NotFound(_))));
    }

    #[test]
    fn test_affinity_blend() {
        let same_cargo = accepted_event("S1", CargoType::Perishable, casablanca());
        let far_other = accepted_event(
            "S1",
            CargoType::Liquid,
            GeoPoint {
                lat: 48.8566,
                lon: 2.3522,
            },
        );
        let target = job("J1", "S1", CargoType::Perishable);

        // One of two accepted events matches cargo and origin
        let affinity = personal_affinity(&[&same_cargo, &far_other], &target);
        assert!((affinity - 0.5).abs() < 1e-9);

        assert_eq!(personal_affinity(&[], &target), 0.0);
    }
}
