// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    ActorRole, CandidateFilter, CargoType, CarrierStats, FactorContribution, GeoPoint, Job,
    JobStatus, MatchCandidate, MatchEvent, MatchOutcome, MatchParams, MatchWeights, PriceRange,
    Reservation, ScoreBreakdown, TimeWindow, Truck, TruckStatus, WEIGHT_SUM_TOLERANCE,
};
pub use requests::{
    AnalyticsQuery, MatchJobsRequest, MatchTokenRequest, MatchTrucksRequest, RecommendationsQuery,
    ReserveMatchRequest,
};
pub use responses::{
    ErrorResponse, HealthResponse, MatchBatchResponse, MatchGroup, RecommendationsResponse,
    ReservationResponse,
};
