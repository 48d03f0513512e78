use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Inclusive [start, end] time window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window length in minutes, zero for degenerate windows
    pub fn duration_minutes(&self) -> f64 {
        ((self.end - self.start).num_seconds().max(0) as f64) / 60.0
    }

    /// Overlap with another window in minutes; `None` when the windows are disjoint
    pub fn overlap_minutes(&self, other: &TimeWindow) -> Option<f64> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start > end {
            return None;
        }
        Some(((end - start).num_seconds() as f64) / 60.0)
    }
}

/// Cargo taxonomy shared between jobs and truck capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CargoType {
    General,
    Perishable,
    Liquid,
    Construction,
}

impl CargoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CargoType::General => "general",
            CargoType::Perishable => "perishable",
            CargoType::Liquid => "liquid",
            CargoType::Construction => "construction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Open,
    Matched,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "OPEN",
            JobStatus::Matched => "MATCHED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TruckStatus {
    Available,
    Reserved,
    Unavailable,
}

impl TruckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TruckStatus::Available => "AVAILABLE",
            TruckStatus::Reserved => "RESERVED",
            TruckStatus::Unavailable => "UNAVAILABLE",
        }
    }
}

/// A load posted by a shipper, owned by the external CRUD service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub shipper_id: String,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub weight_kg: f64,
    pub volume_m3: f64,
    pub cargo_type: CargoType,
    pub pickup_window: TimeWindow,
    pub offered_price: f64,
    pub status: JobStatus,
}

/// A registered truck with capacity and availability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Truck {
    pub id: String,
    pub carrier_id: String,
    pub capacity_kg: f64,
    pub capacity_m3: f64,
    pub supported_cargo: Vec<CargoType>,
    pub location: GeoPoint,
    pub availability: TimeWindow,
    pub status: TruckStatus,
}

impl Truck {
    pub fn supports(&self, cargo: CargoType) -> bool {
        self.supported_cargo.contains(&cargo)
    }
}

/// One soft factor's contribution to a pair score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorContribution {
    pub factor: String,
    pub raw: f64,
    pub weight: f64,
    pub weighted: f64,
}

/// Ordered per-factor explanation of a score
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub factors: Vec<FactorContribution>,
}

impl ScoreBreakdown {
    pub fn push(&mut self, factor: &str, raw: f64, weight: f64) {
        self.factors.push(FactorContribution {
            factor: factor.to_string(),
            raw,
            weight,
            weighted: raw * weight,
        });
    }

    /// Factor name -> weighted contribution, as stored on match events
    pub fn weighted_map(&self) -> HashMap<String, f64> {
        self.factors
            .iter()
            .map(|f| (f.factor.clone(), f.weighted))
            .collect()
    }
}

/// Scored (job, truck) pair under consideration; ephemeral per request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub job_id: String,
    pub truck_id: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub pickup_start: DateTime<Utc>,
    pub estimated_price: f64,
    pub estimated_duration_minutes: f64,
    pub scored_at: DateTime<Utc>,
}

/// Lifecycle outcome of a proposed match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchOutcome {
    Proposed,
    Accepted,
    Rejected,
    Expired,
}

impl MatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOutcome::Proposed => "PROPOSED",
            MatchOutcome::Accepted => "ACCEPTED",
            MatchOutcome::Rejected => "REJECTED",
            MatchOutcome::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PROPOSED" => Some(MatchOutcome::Proposed),
            "ACCEPTED" => Some(MatchOutcome::Accepted),
            "REJECTED" => Some(MatchOutcome::Rejected),
            "EXPIRED" => Some(MatchOutcome::Expired),
            _ => None,
        }
    }
}

/// Append-only record of a match lifecycle transition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    pub id: Uuid,
    pub job_id: String,
    pub truck_id: String,
    pub shipper_id: String,
    pub carrier_id: String,
    pub score: f64,
    pub outcome: MatchOutcome,
    pub cargo_type: Option<CargoType>,
    pub origin: Option<GeoPoint>,
    /// Factor name -> weighted contribution at scoring time
    #[serde(default)]
    pub factors: HashMap<String, f64>,
    pub occurred_at: DateTime<Utc>,
}

/// Time-bounded exclusive hold on a truck pending commit.
///
/// Carries enough of the original candidate to emit the terminal
/// match event without refetching the job.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub token: Uuid,
    pub truck_id: String,
    pub job_id: String,
    pub shipper_id: String,
    pub carrier_id: String,
    pub score: f64,
    pub factors: HashMap<String, f64>,
    pub cargo_type: CargoType,
    pub origin: GeoPoint,
    pub held_until: DateTime<Utc>,
}

impl Reservation {
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        self.held_until <= now
    }

    pub fn event(&self, outcome: MatchOutcome) -> MatchEvent {
        MatchEvent {
            id: Uuid::new_v4(),
            job_id: self.job_id.clone(),
            truck_id: self.truck_id.clone(),
            shipper_id: self.shipper_id.clone(),
            carrier_id: self.carrier_id.clone(),
            score: self.score,
            outcome,
            cargo_type: Some(self.cargo_type),
            origin: Some(self.origin),
            factors: self.factors.clone(),
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Historical pricing and reliability data for one carrier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierStats {
    #[serde(default)]
    pub price_ranges: HashMap<CargoType, PriceRange>,
    #[serde(default)]
    pub on_time_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Shipper,
    Carrier,
}

/// Soft-factor weights; must sum to 1 within tolerance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub proximity: f64,
    pub time: f64,
    pub price: f64,
    pub reliability: f64,
}

/// Tolerance on the weight-sum check
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            proximity: 0.35,
            time: 0.25,
            price: 0.15,
            reliability: 0.25,
        }
    }
}

impl MatchWeights {
    pub fn validate(&self) -> Result<(), String> {
        let all = [
            ("proximityWeight", self.proximity),
            ("timeWeight", self.time),
            ("priceWeight", self.price),
            ("reliabilityWeight", self.reliability),
        ];
        for (name, w) in all {
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(format!("{} must be in [0, 1], got {}", name, w));
            }
        }
        let sum: f64 = all.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(format!("weights must sum to 1.0, got {}", sum));
        }
        Ok(())
    }
}

/// Caller-supplied matching parameters with documented defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchParams {
    #[serde(default = "default_proximity_weight")]
    pub proximity_weight: f64,
    #[serde(default = "default_time_weight")]
    pub time_weight: f64,
    #[serde(default = "default_price_weight")]
    pub price_weight: f64,
    #[serde(default = "default_reliability_weight")]
    pub reliability_weight: f64,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_hold_duration_secs", rename = "holdDurationSeconds")]
    pub hold_duration_secs: u64,
}

fn default_proximity_weight() -> f64 {
    0.35
}
fn default_time_weight() -> f64 {
    0.25
}
fn default_price_weight() -> f64 {
    0.15
}
fn default_reliability_weight() -> f64 {
    0.25
}
fn default_max_candidates() -> usize {
    5
}
fn default_hold_duration_secs() -> u64 {
    300
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            proximity_weight: default_proximity_weight(),
            time_weight: default_time_weight(),
            price_weight: default_price_weight(),
            reliability_weight: default_reliability_weight(),
            max_candidates: default_max_candidates(),
            hold_duration_secs: default_hold_duration_secs(),
        }
    }
}

impl MatchParams {
    pub fn weights(&self) -> MatchWeights {
        MatchWeights {
            proximity: self.proximity_weight,
            time: self.time_weight,
            price: self.price_weight,
            reliability: self.reliability_weight,
        }
    }

    pub fn hold_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.hold_duration_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.weights().validate()?;
        if self.max_candidates < 1 {
            return Err("maxCandidates must be >= 1".to_string());
        }
        if self.hold_duration_secs == 0 || self.hold_duration_secs > 3600 {
            return Err(format!(
                "holdDurationSeconds must be in [1, 3600], got {}",
                self.hold_duration_secs
            ));
        }
        Ok(())
    }
}

/// Filter passed to the external candidate queries
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub cargo_type: Option<CargoType>,
    pub shipper_id: Option<String>,
    pub carrier_id: Option<String>,
    pub limit: Option<usize>,
}
