// Criterion benchmarks for the freight matching engine

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use freight_algo::core::distance::haversine_km;
use freight_algo::core::ranker::rank;
use freight_algo::core::scoring::{build_candidate, score_pair};
use freight_algo::models::{
    CargoType, CarrierStats, GeoPoint, Job, JobStatus, MatchWeights, PriceRange, TimeWindow, Truck,
    TruckStatus,
};
use std::collections::HashMap;

const MAX_DISTANCE_KM: f64 = 500.0;

fn pickup_window() -> TimeWindow {
    TimeWindow::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
    )
}

fn create_job() -> Job {
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
        cargo_type: CargoType::General,
        pickup_window: pickup_window(),
        offered_price: 4500.0,
        status: JobStatus::Open,
    }
}

fn create_truck(id: usize) -> Truck {
    let lat_offset = (id as f64 * 0.01) % 2.0;
    let lon_offset = (id as f64 * 0.01) % 2.0;
    Truck {
        id: format!("T{:04}", id),
        carrier_id: format!("C{:02}", id % 20),
        capacity_kg: 1500.0 + (id % 5) as f64 * 500.0,
        capacity_m3: 20.0,
        supported_cargo: vec![CargoType::General, CargoType::Perishable],
        location: GeoPoint {
            lat: 33.5731 + lat_offset,
            lon: -7.5898 + lon_offset,
        },
        availability: TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap(),
        ),
        status: TruckStatus::Available,
    }
}

fn create_stats() -> CarrierStats {
    let mut price_ranges = HashMap::new();
    price_ranges.insert(
        CargoType::General,
        PriceRange {
            min: 4000.0,
            max: 6000.0,
        },
    );
    CarrierStats {
        price_ranges,
        on_time_rate: Some(0.9),
    }
}

fn bench_haversine(c: &mut Criterion) {
    let a = GeoPoint {
        lat: 33.5731,
        lon: -7.5898,
    };
    let b_point = GeoPoint {
        lat: 34.0209,
        lon: -6.8416,
    };

    c.bench_function("haversine_km", |b| {
        b.iter(|| haversine_km(black_box(a), black_box(b_point)));
    });
}

fn bench_score_pair(c: &mut Criterion) {
    let job = create_job();
    let truck = create_truck(1);
    let stats = create_stats();
    let weights = MatchWeights::default();

    c.bench_function("score_pair", |b| {
        b.iter(|| {
            score_pair(
                black_box(&job),
                black_box(&truck),
                black_box(Some(&stats)),
                black_box(&weights),
                black_box(MAX_DISTANCE_KM),
            )
        });
    });
}

fn bench_score_fleet(c: &mut Criterion) {
    let job = create_job();
    let stats = create_stats();
    let weights = MatchWeights::default();

    let mut group = c.benchmark_group("score_fleet");

    for truck_count in [10, 50, 100, 500, 1000].iter() {
        let trucks: Vec<Truck> = (0..*truck_count).map(create_truck).collect();

        group.bench_with_input(
            BenchmarkId::new("score_and_rank", truck_count),
            truck_count,
            |b, _| {
                b.iter(|| {
                    let candidates: Vec<_> = trucks
                        .iter()
                        .filter_map(|truck| {
                            score_pair(&job, truck, Some(&stats), &weights, MAX_DISTANCE_KM)
                                .ok()
                                .map(|(score, breakdown)| {
                                    build_candidate(&job, truck, score, breakdown)
                                })
                        })
                        .collect();
                    rank(black_box(candidates), 5)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_haversine, bench_score_pair, bench_score_fleet);

criterion_main!(benches);
