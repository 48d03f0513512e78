// Cross-module tests over the scoring and ranking pipeline, plus the
// JSON wire shapes of the public request/response types.

use chrono::{TimeZone, Utc};
use freight_algo::core::ranker::rank;
use freight_algo::core::scoring::{build_candidate, score_pair};
use freight_algo::models::{
    CargoType, CarrierStats, GeoPoint, Job, JobStatus, MatchJobsRequest, MatchParams,
    MatchWeights, PriceRange, RecommendationsQuery, ReservationResponse, TimeWindow, Truck,
    TruckStatus,
};
use std::collections::HashMap;

const MAX_DISTANCE_KM: f64 = 500.0;

fn window(start_h: u32, end_h: u32) -> TimeWindow {
    TimeWindow::new(
        Utc.with_ymd_and_hms(2025, 6, 1, start_h, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 6, 1, end_h, 0, 0).unwrap(),
    )
}

fn job() -> Job {
    Job {
        id: "J1".to_string(),
        shipper_id: "S1".to_string(),
        origin: GeoPoint {
            lat: 33.5731,
            lon: -7.5898,
        },
        destination: GeoPoint {
            lat: 34.0209,
            lon: -6.8416,
        },
        weight_kg: 1000.0,
        volume_m3: 10.0,
        cargo_type: CargoType::Perishable,
        pickup_window: window(9, 12),
        offered_price: 4500.0,
        status: JobStatus::Open,
    }
}

fn truck(id: &str, carrier_id: &str, location: GeoPoint) -> Truck {
    Truck {
        id: id.to_string(),
        carrier_id: carrier_id.to_string(),
        capacity_kg: 1500.0,
        capacity_m3: 20.0,
        supported_cargo: vec![CargoType::Perishable],
        location,
        availability: window(8, 13),
        status: TruckStatus::Available,
    }
}

#[test]
fn test_pipeline_prefers_near_reliable_truck() {
    let job = job();
    let near = truck(
        "T1",
        "C1",
        GeoPoint {
            lat: 33.58,
            lon: -7.59,
        },
    );
    let far = truck(
        "T2",
        "C2",
        GeoPoint {
            lat: 35.7595,
            lon: -5.8340,
        },
    );

    let mut price_ranges = HashMap::new();
    price_ranges.insert(
        CargoType::Perishable,
        PriceRange {
            min: 4000.0,
            max: 6000.0,
        },
    );
    let stats = CarrierStats {
        price_ranges,
        on_time_rate: Some(0.95),
    };

    let weights = MatchWeights::default();
    let candidates: Vec<_> = [(near, Some(&stats)), (far, None)]
        .into_iter()
        .filter_map(|(t, s)| {
            score_pair(&job, &t, s, &weights, MAX_DISTANCE_KM)
                .ok()
                .map(|(score, breakdown)| build_candidate(&job, &t, score, breakdown))
        })
        .collect();

    let ranking = rank(candidates, 5).unwrap();
    let top = ranking.top();

    assert_eq!(top.len(), 2);
    assert_eq!(top[0].truck_id, "T1");
    assert!(top[0].score > top[1].score);
    assert!(top[0].estimated_price > 0.0);
    assert!(top[0].estimated_duration_minutes > 0.0);
}

#[test]
fn test_scores_are_deterministic() {
    let job = job();
    let t = truck("T1", "C1", job.origin);
    let weights = MatchWeights::default();

    let (a, _) = score_pair(&job, &t, None, &weights, MAX_DISTANCE_KM).unwrap();
    let (b, _) = score_pair(&job, &t, None, &weights, MAX_DISTANCE_KM).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_match_request_wire_shape() {
    let json = r#"{
        "jobIds": ["J1", "J2"],
        "params": {
            "proximityWeight": 0.4,
            "timeWeight": 0.3,
            "priceWeight": 0.1,
            "reliabilityWeight": 0.2,
            "maxCandidates": 3,
            "holdDurationSeconds": 120
        }
    }"#;

    let request: MatchJobsRequest = serde_json::from_str(json).unwrap();
    assert_eq!(request.job_ids, vec!["J1", "J2"]);

    let params = request.params.unwrap();
    assert_eq!(params.max_candidates, 3);
    assert_eq!(params.hold_duration_secs, 120);
    assert!(params.validate().is_ok());
}

#[test]
fn test_match_request_defaults_apply() {
    let request: MatchJobsRequest = serde_json::from_str(r#"{"jobIds": ["J1"]}"#).unwrap();
    assert!(request.params.is_none());

    let params: MatchParams = serde_json::from_str("{}").unwrap();
    assert_eq!(params.max_candidates, 5);
    assert_eq!(params.hold_duration_secs, 300);
    assert!(params.weights().validate().is_ok());
}

#[test]
fn test_recommendations_query_limit_is_optional() {
    // An omitted limit stays None so the handler can apply the
    // configured default
    let query: RecommendationsQuery = serde_json::from_str(r#"{"actorId": "S1"}"#).unwrap();
    assert_eq!(query.limit, None);

    let query: RecommendationsQuery =
        serde_json::from_str(r#"{"actorId": "S1", "limit": 10}"#).unwrap();
    assert_eq!(query.limit, Some(10));
}

#[test]
fn test_reservation_response_omits_absent_fields() {
    let body = serde_json::to_value(ReservationResponse::outcome("BUSY")).unwrap();
    assert_eq!(body["outcome"], "BUSY");
    assert!(body.get("token").is_none());
    assert!(body.get("heldUntil").is_none());

    let token = uuid::Uuid::new_v4();
    let body =
        serde_json::to_value(ReservationResponse::reserved(token, Utc::now())).unwrap();
    assert_eq!(body["outcome"], "RESERVED");
    assert_eq!(body["token"], token.to_string());
    assert!(body.get("heldUntil").is_some());
}
