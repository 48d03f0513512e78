use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::models::{
    ActorRole, CandidateFilter, CarrierStats, Job, JobStatus, Truck, TruckStatus,
};
use crate::services::store::{MarketplaceStore, StoreError};

/// Errors that can occur when talking to the marketplace CRUD backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(what) => StoreError::NotFound(what),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Marketplace backend API client
///
/// Handles all communication with the CRUD service that owns job,
/// truck, and user records:
/// - Fetching and querying jobs and trucks
/// - Persisting status transitions
/// - Fetching carrier history and actor roles
pub struct BackendClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl BackendClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            api_key,
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        what: &str,
    ) -> Result<T, BackendError> {
        let url = self.url(path);
        tracing::debug!("Fetching {} from: {}", what, url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(BackendError::NotFound(what.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(BackendError::Unauthorized)
            }
            status if !status.is_success() => {
                return Err(BackendError::ApiError(format!(
                    "Failed to fetch {}: {}",
                    what, status
                )));
            }
            _ => {}
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    async fn patch_status(&self, path: &str, status: &str) -> Result<(), BackendError> {
        let url = self.url(path);
        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "status": status }))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(BackendError::NotFound(path.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BackendError::Unauthorized),
            s if !s.is_success() => Err(BackendError::ApiError(format!(
                "Failed to update {}: {}",
                path, s
            ))),
            _ => Ok(()),
        }
    }

    fn list_query(filter: &CandidateFilter, status: &str, actor_param: Option<(&str, &str)>) -> String {
        let mut params = vec![format!("status={}", status)];
        if let Some(cargo) = filter.cargo_type {
            params.push(format!("cargoType={}", urlencoding::encode(cargo.as_str())));
        }
        if let Some((name, value)) = actor_param {
            params.push(format!("{}={}", name, urlencoding::encode(value)));
        }
        if let Some(limit) = filter.limit {
            params.push(format!("limit={}", limit));
        }
        params.join("&")
    }
}

#[async_trait]
impl MarketplaceStore for BackendClient {
    async fn fetch_job(&self, id: &str) -> Result<Job, StoreError> {
        let path = format!("/jobs/{}", urlencoding::encode(id));
        Ok(self.get_json(&path, &format!("job {}", id)).await?)
    }

    async fn fetch_truck(&self, id: &str) -> Result<Truck, StoreError> {
        let path = format!("/trucks/{}", urlencoding::encode(id));
        Ok(self.get_json(&path, &format!("truck {}", id)).await?)
    }

    async fn query_open_jobs(&self, filter: &CandidateFilter) -> Result<Vec<Job>, StoreError> {
        let query = Self::list_query(
            filter,
            JobStatus::Open.as_str(),
            filter.shipper_id.as_deref().map(|s| ("shipperId", s)),
        );
        let jobs: Vec<Job> = self
            .get_json(&format!("/jobs?{}", query), "open jobs")
            .await?;
        tracing::debug!("Queried {} open jobs", jobs.len());
        Ok(jobs)
    }

    async fn query_available_trucks(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<Truck>, StoreError> {
        let query = Self::list_query(
            filter,
            TruckStatus::Available.as_str(),
            filter.carrier_id.as_deref().map(|c| ("carrierId", c)),
        );
        let trucks: Vec<Truck> = self
            .get_json(&format!("/trucks?{}", query), "available trucks")
            .await?;
        tracing::debug!("Queried {} available trucks", trucks.len());
        Ok(trucks)
    }

    async fn persist_job_status(&self, id: &str, status: JobStatus) -> Result<(), StoreError> {
        let path = format!("/jobs/{}/status", urlencoding::encode(id));
        Ok(self.patch_status(&path, status.as_str()).await?)
    }

    async fn persist_truck_status(&self, id: &str, status: TruckStatus) -> Result<(), StoreError> {
        let path = format!("/trucks/{}/status", urlencoding::encode(id));
        Ok(self.patch_status(&path, status.as_str()).await?)
    }

    async fn carrier_stats(&self, carrier_id: &str) -> Result<Option<CarrierStats>, StoreError> {
        let path = format!("/carriers/{}/stats", urlencoding::encode(carrier_id));
        match self
            .get_json(&path, &format!("carrier stats {}", carrier_id))
            .await
        {
            Ok(stats) => Ok(Some(stats)),
            // No history yet is a normal state, not a failure
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(other) => Err(other.into()),
        }
    }

    async fn actor_role(&self, actor_id: &str) -> Result<ActorRole, StoreError> {
        #[derive(serde::Deserialize)]
        struct UserDoc {
            role: ActorRole,
        }

        let path = format!("/users/{}", urlencoding::encode(actor_id));
        let doc: UserDoc = self.get_json(&path, &format!("actor {}", actor_id)).await?;
        Ok(doc.role)
    }
}
