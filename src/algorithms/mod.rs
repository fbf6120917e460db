pub mod finalizer;
pub mod nearest_coverage;
pub mod price_optimal;
pub mod search_state;
pub mod tsp;

// Common algorithm traits
use crate::error::{OptimizeError, TspError};
use crate::models::Time;
use crate::utils::cancel::CancellationToken;

use self::search_state::{SearchContext, Selection};
use self::tsp::Tour;

/// Exact solver for the round trip over a square cost matrix
pub trait TspSolver {
    /// Cheapest cycle through every node, starting and ending at `start`.
    /// Entries of `-1` mark missing edges.
    fn solve(&self, matrix: &[Vec<Time>], start: usize) -> Result<Tour, TspError>;
}

/// Chooses which stores to visit and what to buy where
pub trait StoreSelector {
    fn select(
        &self,
        context: &SearchContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<Selection, OptimizeError>;
}
