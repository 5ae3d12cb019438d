//! Terminal status for a venue from the search outcome and the verdict.

use super::types::{Hit, Reason, ResolutionResult, Status, Strategy, StrategyTag, Verdict};

/// Outcome of walking the strategy list for one venue.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// First strategy that produced a hit, and what the validator made of it.
    Found { strategy: Strategy, hit: Hit, verdict: Verdict },
    /// Every strategy came back empty or failed.
    Exhausted { last: Strategy },
}

pub fn classify(venue_id: &str, outcome: SearchOutcome) -> ResolutionResult {
    match outcome {
        SearchOutcome::Found { strategy, hit, verdict } => {
            let (status, reason) = match verdict {
                Verdict::Accepted => (Status::Ok, None),
                Verdict::Rejected(reason) => (Status::Review, Some(reason)),
            };
            ResolutionResult {
                venue_id: venue_id.to_string(),
                status,
                hit: Some(hit),
                strategy_used: strategy.tag,
                query_used: strategy.describe(),
                reason,
            }
        }
        SearchOutcome::Exhausted { last } => miss(venue_id, last.tag, last.describe()),
    }
}

fn miss(venue_id: &str, tag: StrategyTag, query_used: String) -> ResolutionResult {
    ResolutionResult {
        venue_id: venue_id.to_string(),
        status: Status::Miss,
        hit: None,
        strategy_used: tag,
        query_used,
        reason: Some(Reason::NoResult),
    }
}
