use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{MatchEvent, MatchOutcome};

/// Aggregated view of match quality and acceptance over a time window.
///
/// Rates are `None` rather than NaN when the window holds no proposals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub total_proposed: u64,
    pub total_accepted: u64,
    pub total_rejected: u64,
    pub total_expired: u64,
    pub acceptance_rate: Option<f64>,
    pub average_score: Option<f64>,
    pub score_distribution_by_factor: HashMap<String, f64>,
}

/// Pure read-side aggregation over match events; never mutates history
pub fn summarize(events: &[MatchEvent]) -> MatchSummary {
    let mut proposed = 0u64;
    let mut accepted = 0u64;
    let mut rejected = 0u64;
    let mut expired = 0u64;

    let mut score_sum = 0.0;
    let mut factor_sums: HashMap<String, f64> = HashMap::new();
    let mut factor_counts: HashMap<String, u64> = HashMap::new();

    for event in events {
        match event.outcome {
            MatchOutcome::Proposed => {
                proposed += 1;
                score_sum += event.score;
                for (factor, weighted) in &event.factors {
                    *factor_sums.entry(factor.clone()).or_default() += weighted;
                    *factor_counts.entry(factor.clone()).or_default() += 1;
                }
            }
            MatchOutcome::Accepted => accepted += 1,
            MatchOutcome::Rejected => rejected += 1,
            MatchOutcome::Expired => expired += 1,
        }
    }

    let acceptance_rate = if proposed > 0 {
        Some(accepted as f64 / proposed as f64)
    } else {
        None
    };

    let average_score = if proposed > 0 {
        Some(score_sum / proposed as f64)
    } else {
        None
    };

    let score_distribution_by_factor = factor_sums
        .into_iter()
        .map(|(factor, sum)| {
            let count = factor_counts[&factor].max(1);
            (factor, sum / count as f64)
        })
        .collect();

    MatchSummary {
        total_proposed: proposed,
        total_accepted: accepted,
        total_rejected: rejected,
        total_expired: expired,
        acceptance_rate,
        average_score,
        score_distribution_by_factor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchEvent;
    use chrono::Utc;
    use uuid::Uuid;

    fn event(outcome: MatchOutcome, score: f64, factors: &[(&str, f64)]) -> MatchEvent {
        MatchEvent {
            id: Uuid::new_v4(),
            job_id: "J1".to_string(),
            truck_id: "T1".to_string(),
            shipper_id: "S1".to_string(),
            carrier_id: "C1".to_string(),
            score,
            outcome,
            cargo_type: None,
            origin: None,
            factors: factors
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_window_yields_zero_counts_and_no_rates() {
        let summary = summarize(&[]);

        assert_eq!(summary.total_proposed, 0);
        assert_eq!(summary.total_accepted, 0);
        assert_eq!(summary.total_rejected, 0);
        assert_eq!(summary.total_expired, 0);
        assert_eq!(summary.acceptance_rate, None);
        assert_eq!(summary.average_score, None);
        assert!(summary.score_distribution_by_factor.is_empty());
    }

    #[test]
    fn test_counts_and_acceptance_rate() {
        let events = vec![
            event(MatchOutcome::Proposed, 80.0, &[]),
            event(MatchOutcome::Proposed, 60.0, &[]),
            event(MatchOutcome::Proposed, 40.0, &[]),
            event(MatchOutcome::Proposed, 20.0, &[]),
            event(MatchOutcome::Accepted, 80.0, &[]),
            event(MatchOutcome::Rejected, 60.0, &[]),
            event(MatchOutcome::Expired, 40.0, &[]),
        ];

        let summary = summarize(&events);

        assert_eq!(summary.total_proposed, 4);
        assert_eq!(summary.total_accepted, 1);
        assert_eq!(summary.total_rejected, 1);
        assert_eq!(summary.total_expired, 1);
        assert_eq!(summary.acceptance_rate, Some(0.25));
        assert_eq!(summary.average_score, Some(50.0));
    }

    #[test]
    fn test_factor_distribution_is_mean_contribution() {
        let events = vec![
            event(
                MatchOutcome::Proposed,
                70.0,
                &[("proximity", 0.30), ("time", 0.20)],
            ),
            event(
                MatchOutcome::Proposed,
                50.0,
                &[("proximity", 0.10), ("time", 0.20)],
            ),
        ];

        let summary = summarize(&events);
        let by_factor = &summary.score_distribution_by_factor;

        assert!((by_factor["proximity"] - 0.20).abs() < 1e-12);
        assert!((by_factor["time"] - 0.20).abs() < 1e-12);
    }
}
