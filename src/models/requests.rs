use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::MatchParams;

/// Request to match a batch of jobs against available trucks
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MatchJobsRequest {
    #[validate(length(min = 1))]
    pub job_ids: Vec<String>,
    #[serde(default)]
    pub params: Option<MatchParams>,
}

/// Request to match a batch of trucks against open jobs
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MatchTrucksRequest {
    #[validate(length(min = 1))]
    pub truck_ids: Vec<String>,
    #[serde(default)]
    pub params: Option<MatchParams>,
}

/// Query parameters for personalized recommendations; `limit` falls
/// back to the configured default when omitted
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsQuery {
    #[validate(length(min = 1))]
    pub actor_id: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Time window for the analytics summary; both bounds optional
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub to: Option<chrono::DateTime<chrono::Utc>>,
}

/// Request to place a hold on a truck for a job
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReserveMatchRequest {
    #[validate(length(min = 1))]
    pub job_id: String,
    #[validate(length(min = 1))]
    pub truck_id: String,
    #[serde(default)]
    pub params: Option<MatchParams>,
}

/// Request to finalize or abandon a held match
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchTokenRequest {
    pub token: uuid::Uuid,
}
