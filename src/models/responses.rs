use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{ActorRole, MatchCandidate};

/// Ranked matches for one subject (job or truck) in a batch request.
///
/// Batch requests succeed partially: an unknown or closed id is reported
/// here instead of failing the whole request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchGroup {
    pub id: String,
    pub matches: Vec<MatchCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MatchGroup {
    pub fn ranked(id: &str, matches: Vec<MatchCandidate>) -> Self {
        Self {
            id: id.to_string(),
            matches,
            error: None,
        }
    }

    pub fn failed(id: &str, reason: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            matches: vec![],
            error: Some(reason.into()),
        }
    }
}

/// Response for the batch matching endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchBatchResponse {
    pub results: Vec<MatchGroup>,
}

/// Response for personalized recommendations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsResponse {
    pub actor_id: String,
    pub role: ActorRole,
    pub matches: Vec<MatchCandidate>,
}

/// Response for reserve/commit/release; `outcome` is the protocol result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub held_until: Option<DateTime<Utc>>,
}

impl ReservationResponse {
    pub fn outcome(outcome: &str) -> Self {
        Self {
            outcome: outcome.to_string(),
            token: None,
            held_until: None,
        }
    }

    pub fn reserved(token: Uuid, held_until: DateTime<Utc>) -> Self {
        Self {
            outcome: "RESERVED".to_string(),
            token: Some(token),
            held_until: Some(held_until),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
