use std::cmp::Ordering;

use crate::core::MatchError;
use crate::models::MatchCandidate;

/// A sorted, truncatable view over scored candidates.
///
/// Sorting happens exactly once; `top` and `page` only re-slice the
/// ordered set, so pagination never re-scores.
#[derive(Debug, Clone)]
pub struct Ranking {
    ordered: Vec<MatchCandidate>,
    limit: usize,
}

impl Ranking {
    /// Top `limit` candidates in rank order
    pub fn top(&self) -> &[MatchCandidate] {
        &self.ordered[..self.limit.min(self.ordered.len())]
    }

    /// Arbitrary page over the full ordered set
    pub fn page(&self, offset: usize, len: usize) -> &[MatchCandidate] {
        let start = offset.min(self.ordered.len());
        let end = (offset + len).min(self.ordered.len());
        &self.ordered[start..end]
    }

    pub fn into_top(mut self) -> Vec<MatchCandidate> {
        self.ordered.truncate(self.limit);
        self.ordered
    }

    /// Total candidates considered, before truncation
    pub fn total(&self) -> usize {
        self.ordered.len()
    }
}

/// Total order over candidates: score descending, then earlier pickup
/// start, then smaller truck id. Deterministic for reproducible results
/// and stable pagination.
pub fn compare(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.pickup_start.cmp(&b.pickup_start))
        .then_with(|| a.truck_id.cmp(&b.truck_id))
}

/// Order candidates and fix the truncation limit (must be >= 1)
pub fn rank(mut candidates: Vec<MatchCandidate>, limit: usize) -> Result<Ranking, MatchError> {
    if limit < 1 {
        return Err(MatchError::Validation(
            "ranking limit must be >= 1".to_string(),
        ));
    }

    candidates.sort_by(compare);

    Ok(Ranking {
        ordered: candidates,
        limit,
    })
}
