pub mod analytics;
pub mod distance;
pub mod engine;
pub mod feasibility;
pub mod ledger;
pub mod ranker;
pub mod scoring;

use thiserror::Error;

/// Failures on the matching read paths. Protocol outcomes on the
/// reservation path are not errors; see `core::ledger`.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("dependency unavailable: {0}")]
    Dependency(String),
}

pub use analytics::{summarize, MatchSummary};
pub use engine::{PairAssessment, RecommendationEngine};
pub use feasibility::{check_feasibility, Infeasibility};
pub use ledger::{CommitOutcome, LedgerError, ReleaseOutcome, ReservationLedger, ReserveOutcome};
pub use ranker::{rank, Ranking};
pub use scoring::{build_candidate, score_pair};
