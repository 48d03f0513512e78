use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use chrono::{Duration, Utc};
use validator::Validate;

use crate::config::MatchingSettings;
use crate::core::engine::PairAssessment;
use crate::core::ledger::{CommitOutcome, LedgerError, ReleaseOutcome, ReserveOutcome};
use crate::core::{summarize, MatchError, RecommendationEngine, ReservationLedger};
use crate::models::{
    AnalyticsQuery, ErrorResponse, HealthResponse, MatchBatchResponse, MatchJobsRequest,
    MatchParams, MatchTokenRequest, MatchTrucksRequest, RecommendationsQuery,
    RecommendationsResponse, ReservationResponse, ReserveMatchRequest, TimeWindow,
};
use crate::services::{BackendClient, CacheKey, CacheManager, EventStore, PostgresEventStore};

/// Default analytics lookback when the caller omits `from`
const DEFAULT_ANALYTICS_DAYS: i64 = 30;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine<BackendClient, PostgresEventStore>>,
    pub ledger: Arc<ReservationLedger<BackendClient, PostgresEventStore>>,
    pub events: Arc<PostgresEventStore>,
    pub cache: Arc<CacheManager>,
    pub matching: MatchingSettings,
}

/// Configure all matching routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matching/jobs-to-trucks", web::post().to(match_jobs_to_trucks))
        .route("/matching/trucks-to-jobs", web::post().to(match_trucks_to_jobs))
        .route("/matching/reserve", web::post().to(reserve_match))
        .route("/matching/commit", web::post().to(commit_match))
        .route("/matching/release", web::post().to(release_match))
        .route("/matching/recommendations", web::get().to(recommendations))
        .route("/matching/analytics", web::get().to(analytics));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.events.health_check().await.unwrap_or(false);
    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

fn error_body(error: &str, message: impl Into<String>, status_code: u16) -> ErrorResponse {
    ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code,
    }
}

fn match_error_response(err: MatchError) -> HttpResponse {
    match err {
        MatchError::Validation(message) => {
            HttpResponse::BadRequest().json(error_body("Validation failed", message, 400))
        }
        MatchError::NotFound(message) => {
            HttpResponse::NotFound().json(error_body("Not found", message, 404))
        }
        MatchError::Dependency(message) => {
            tracing::error!("Dependency failure: {}", message);
            HttpResponse::ServiceUnavailable().json(error_body("Dependency unavailable", message, 503))
        }
    }
}

fn ledger_error_response(err: LedgerError) -> HttpResponse {
    match err {
        LedgerError::NotFound(message) => {
            HttpResponse::NotFound().json(error_body("Not found", message, 404))
        }
        LedgerError::Dependency(message) => {
            tracing::error!("Dependency failure: {}", message);
            HttpResponse::ServiceUnavailable().json(error_body("Dependency unavailable", message, 503))
        }
    }
}

/// Reservation state changed; cached read results may now be stale
async fn invalidate_read_caches(state: &AppState) {
    for pattern in [CacheKey::all_recommendations(), CacheKey::all_analytics()] {
        if let Err(e) = state.cache.invalidate_pattern(pattern).await {
            tracing::warn!("Failed to invalidate cache pattern {}: {}", pattern, e);
        }
    }
}

/// Batch matching: rank available trucks for each job
///
/// POST /api/v1/matching/jobs-to-trucks
///
/// Request body:
/// ```json
/// {
///   "jobIds": ["string"],
///   "params": { "maxCandidates": 5 }
/// }
/// ```
async fn match_jobs_to_trucks(
    state: web::Data<AppState>,
    req: web::Json<MatchJobsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(error_body(
            "Validation failed",
            errors.to_string(),
            400,
        ));
    }

    let params = req.params.clone().unwrap_or_default();
    tracing::info!("Matching {} jobs to trucks", req.job_ids.len());

    match state.engine.match_jobs_to_trucks(&req.job_ids, &params).await {
        Ok(results) => HttpResponse::Ok().json(MatchBatchResponse { results }),
        Err(e) => match_error_response(e),
    }
}

/// Batch matching: rank open jobs for each truck
///
/// POST /api/v1/matching/trucks-to-jobs
async fn match_trucks_to_jobs(
    state: web::Data<AppState>,
    req: web::Json<MatchTrucksRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(error_body(
            "Validation failed",
            errors.to_string(),
            400,
        ));
    }

    let params = req.params.clone().unwrap_or_default();
    tracing::info!("Matching {} trucks to jobs", req.truck_ids.len());

    match state.engine.match_trucks_to_jobs(&req.truck_ids, &params).await {
        Ok(results) => HttpResponse::Ok().json(MatchBatchResponse { results }),
        Err(e) => match_error_response(e),
    }
}

/// Place a time-bounded hold on a truck for a job
///
/// POST /api/v1/matching/reserve
///
/// Request body:
/// ```json
/// {
///   "jobId": "string",
///   "truckId": "string",
///   "params": { "holdDurationSeconds": 300 }
/// }
/// ```
async fn reserve_match(
    state: web::Data<AppState>,
    req: web::Json<ReserveMatchRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(error_body(
            "Validation failed",
            errors.to_string(),
            400,
        ));
    }

    let params: MatchParams = req.params.clone().unwrap_or_default();

    // Score first so the hold carries the breakdown for its events
    let candidate = match state
        .engine
        .assess_pair(&req.job_id, &req.truck_id, &params)
        .await
    {
        Ok(PairAssessment::Scored(candidate)) => candidate,
        Ok(PairAssessment::Infeasible(reason)) => {
            return HttpResponse::UnprocessableEntity().json(error_body(
                "Infeasible pair",
                reason.to_string(),
                422,
            ));
        }
        Err(e) => return match_error_response(e),
    };

    let outcome = state
        .ledger
        .try_reserve(&req.truck_id, &req.job_id, params.hold_duration(), &candidate)
        .await;

    match outcome {
        Ok(ReserveOutcome::Reserved { token, held_until }) => {
            invalidate_read_caches(&state).await;
            HttpResponse::Ok().json(ReservationResponse::reserved(token, held_until))
        }
        Ok(ReserveOutcome::Busy) => {
            HttpResponse::Conflict().json(ReservationResponse::outcome("BUSY"))
        }
        Ok(ReserveOutcome::NotAvailable) => {
            HttpResponse::Conflict().json(ReservationResponse::outcome("NOT_AVAILABLE"))
        }
        Ok(ReserveOutcome::JobNotOpen) => {
            HttpResponse::Conflict().json(ReservationResponse::outcome("JOB_NOT_OPEN"))
        }
        Err(e) => ledger_error_response(e),
    }
}

/// Finalize a held match
///
/// POST /api/v1/matching/commit
async fn commit_match(
    state: web::Data<AppState>,
    req: web::Json<MatchTokenRequest>,
) -> impl Responder {
    match state.ledger.commit(req.token).await {
        Ok(CommitOutcome::Committed) => {
            invalidate_read_caches(&state).await;
            HttpResponse::Ok().json(ReservationResponse::outcome("COMMITTED"))
        }
        Ok(CommitOutcome::Expired) => {
            HttpResponse::Conflict().json(ReservationResponse::outcome("EXPIRED"))
        }
        Ok(CommitOutcome::Invalid) => {
            HttpResponse::Conflict().json(ReservationResponse::outcome("INVALID"))
        }
        Err(e) => ledger_error_response(e),
    }
}

/// Abandon a held match
///
/// POST /api/v1/matching/release
async fn release_match(
    state: web::Data<AppState>,
    req: web::Json<MatchTokenRequest>,
) -> impl Responder {
    match state.ledger.release(req.token).await {
        Ok(ReleaseOutcome::Released) => {
            invalidate_read_caches(&state).await;
            HttpResponse::Ok().json(ReservationResponse::outcome("RELEASED"))
        }
        Ok(ReleaseOutcome::Invalid) => {
            HttpResponse::Conflict().json(ReservationResponse::outcome("INVALID"))
        }
        Err(e) => ledger_error_response(e),
    }
}

/// Personalized recommendations for an actor
///
/// GET /api/v1/matching/recommendations?actorId={id}&limit=5
async fn recommendations(
    state: web::Data<AppState>,
    query: web::Query<RecommendationsQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return HttpResponse::BadRequest().json(error_body(
            "Validation failed",
            errors.to_string(),
            400,
        ));
    }

    let limit = query
        .limit
        .unwrap_or(state.matching.default_limit)
        .clamp(1, state.matching.max_limit);
    let cache_key = CacheKey::recommendations(&query.actor_id, limit);

    if let Ok(cached) = state.cache.get::<RecommendationsResponse>(&cache_key).await {
        return HttpResponse::Ok().json(cached);
    }

    match state.engine.recommendations(&query.actor_id, limit).await {
        Ok((role, matches)) => {
            let response = RecommendationsResponse {
                actor_id: query.actor_id.clone(),
                role,
                matches,
            };
            if let Err(e) = state.cache.set(&cache_key, &response).await {
                tracing::warn!("Failed to cache recommendations: {}", e);
            }
            HttpResponse::Ok().json(response)
        }
        Err(e) => match_error_response(e),
    }
}

/// Acceptance and score analytics over a time window
///
/// GET /api/v1/matching/analytics?from={rfc3339}&to={rfc3339}
async fn analytics(
    state: web::Data<AppState>,
    query: web::Query<AnalyticsQuery>,
) -> impl Responder {
    let to = query.to.unwrap_or_else(Utc::now);
    let from = query
        .from
        .unwrap_or_else(|| to - Duration::days(DEFAULT_ANALYTICS_DAYS));

    if from > to {
        return HttpResponse::BadRequest().json(error_body(
            "Validation failed",
            "from must not be after to",
            400,
        ));
    }

    let cache_key = CacheKey::analytics(&from.to_rfc3339(), &to.to_rfc3339());
    if let Ok(cached) = state
        .cache
        .get::<crate::core::MatchSummary>(&cache_key)
        .await
    {
        return HttpResponse::Ok().json(cached);
    }

    let window = TimeWindow::new(from, to);
    match state.events.events_between(&window).await {
        Ok(events) => {
            let summary = summarize(&events);
            if let Err(e) = state.cache.set(&cache_key, &summary).await {
                tracing::warn!("Failed to cache analytics: {}", e);
            }
            HttpResponse::Ok().json(summary)
        }
        Err(e) => {
            tracing::error!("Failed to load events for analytics: {}", e);
            HttpResponse::ServiceUnavailable().json(error_body(
                "Dependency unavailable",
                e.to_string(),
                503,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_response() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            timestamp: Utc::now(),
        };

        assert_eq!(response.status, "healthy");
    }

    #[test]
    fn test_error_body() {
        let body = error_body("Validation failed", "jobIds must not be empty", 400);
        assert_eq!(body.status_code, 400);
        assert_eq!(body.error, "Validation failed");
    }
}
