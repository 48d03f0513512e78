use chrono::Utc;

use crate::core::distance::haversine_km;
use crate::core::feasibility::{check_feasibility, Infeasibility};
use crate::models::{
    CarrierStats, Job, MatchCandidate, MatchWeights, ScoreBreakdown, TimeWindow, Truck,
};

pub const FACTOR_PROXIMITY: &str = "proximity";
pub const FACTOR_TIME: &str = "time";
pub const FACTOR_PRICE: &str = "price";
pub const FACTOR_RELIABILITY: &str = "reliability";
pub const FACTOR_PERSONALIZATION: &str = "personalization";

/// Factor value used when a carrier has no usable history
const NEUTRAL_FACTOR: f64 = 0.5;

/// Base freight rate per kilometer per ton, used for price estimates
const BASE_RATE_PER_KM_TON: f64 = 2.5;

/// Assumed average speed for transit-duration estimates
const AVERAGE_SPEED_KMH: f64 = 60.0;

/// Score one (job, truck) pair.
///
/// Hard feasibility filters run first and short-circuit with the
/// failure reason. The surviving soft factors are each normalized to
/// [0, 1], weighted, and summed into a [0, 100] score with a
/// per-factor breakdown for explainability.
pub fn score_pair(
    job: &Job,
    truck: &Truck,
    stats: Option<&CarrierStats>,
    weights: &MatchWeights,
    max_useful_distance_km: f64,
) -> Result<(f64, ScoreBreakdown), Infeasibility> {
    check_feasibility(job, truck)?;

    let distance_km = haversine_km(truck.location, job.origin);

    let proximity = proximity_score(distance_km, max_useful_distance_km);
    let time_fit = time_fit_score(&job.pickup_window, &truck.availability);
    let price_fit = price_fit_score(job, stats);
    let reliability = reliability_score(stats);

    let mut breakdown = ScoreBreakdown::default();
    breakdown.push(FACTOR_PROXIMITY, proximity, weights.proximity);
    breakdown.push(FACTOR_TIME, time_fit, weights.time);
    breakdown.push(FACTOR_PRICE, price_fit, weights.price);
    breakdown.push(FACTOR_RELIABILITY, reliability, weights.reliability);

    let total: f64 = breakdown.factors.iter().map(|f| f.weighted).sum();
    let score = (total * 100.0).clamp(0.0, 100.0);

    Ok((score, breakdown))
}

/// Assemble the ephemeral candidate returned to callers, including the
/// estimated price and transit duration for the job's route
pub fn build_candidate(
    job: &Job,
    truck: &Truck,
    score: f64,
    breakdown: ScoreBreakdown,
) -> MatchCandidate {
    let route_km = haversine_km(job.origin, job.destination);

    MatchCandidate {
        job_id: job.id.clone(),
        truck_id: truck.id.clone(),
        score,
        breakdown,
        pickup_start: job.pickup_window.start,
        estimated_price: estimate_price(job.weight_kg, route_km),
        estimated_duration_minutes: estimate_duration_minutes(route_km),
        scored_at: Utc::now(),
    }
}

/// Proximity score (0-1): exponential decay with distance, zero at or
/// beyond the maximum useful distance
#[inline]
fn proximity_score(distance_km: f64, max_useful_distance_km: f64) -> f64 {
    if max_useful_distance_km <= 0.0 || distance_km >= max_useful_distance_km {
        return 0.0;
    }
    (-distance_km / (max_useful_distance_km * 0.5)).exp()
}

/// Time-fit score (0-1): fraction of the pickup window the truck's
/// availability covers; 1.0 for full containment
#[inline]
fn time_fit_score(pickup: &TimeWindow, availability: &TimeWindow) -> f64 {
    let overlap = match availability.overlap_minutes(pickup) {
        Some(minutes) => minutes,
        None => return 0.0,
    };

    let window = pickup.duration_minutes();
    if window <= 0.0 {
        // Degenerate pickup instant covered by the availability window
        return 1.0;
    }

    (overlap / window).clamp(0.0, 1.0)
}

/// Price-fit score (0-1): 1.0 inside the carrier's historical accepted
/// range for this cargo type, decaying with relative distance outside
/// it; neutral without history
#[inline]
fn price_fit_score(job: &Job, stats: Option<&CarrierStats>) -> f64 {
    let range = match stats.and_then(|s| s.price_ranges.get(&job.cargo_type)) {
        Some(range) => range,
        None => return NEUTRAL_FACTOR,
    };

    let price = job.offered_price;
    if price >= range.min && price <= range.max {
        return 1.0;
    }

    let mid = (range.min + range.max) / 2.0;
    if mid <= 0.0 {
        return NEUTRAL_FACTOR;
    }

    let gap = if price < range.min {
        range.min - price
    } else {
        price - range.max
    };

    (1.0 - gap / mid).clamp(0.0, 1.0)
}

/// Reliability score (0-1): carrier on-time rate, neutral without history
#[inline]
fn reliability_score(stats: Option<&CarrierStats>) -> f64 {
    stats
        .and_then(|s| s.on_time_rate)
        .map(|rate| rate.clamp(0.0, 1.0))
        .unwrap_or(NEUTRAL_FACTOR)
}

/// Estimated price from the base per-km-per-ton rate
#[inline]
pub fn estimate_price(weight_kg: f64, route_km: f64) -> f64 {
    (weight_kg / 1000.0) * route_km * BASE_RATE_PER_KM_TON
}

/// Estimated transit duration in minutes at the assumed average speed
#[inline]
pub fn estimate_duration_minutes(route_km: f64) -> f64 {
    route_km / AVERAGE_SPEED_KMH * 60.0
}
