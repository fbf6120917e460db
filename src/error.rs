// Error types shared by the solvers, the collaborators and the pipeline

use std::time::Duration;
use thiserror::Error;

/// Errors from the exact TSP solvers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TspError {
    /// The matrix is not square, too small or too large, or the start node
    /// is out of range.
    #[error("invalid tsp input: {0}")]
    InvalidInput(String),

    /// Every Hamiltonian cycle touches an unreachable edge.
    #[error("no path")]
    NoPath,
}

/// Failures reported by an external collaborator.
///
/// These are propagated to the caller unchanged; the engine never retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("{service} is unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },

    #[error("{service} did not answer within {timeout:?}")]
    Timeout {
        service: &'static str,
        timeout: Duration,
    },

    #[error("{service} returned a malformed response: {message}")]
    Malformed {
        service: &'static str,
        message: String,
    },
}

/// Errors returned by [`crate::services::Optimizer::optimize`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizeError {
    /// The request was rejected before any search ran.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// No combination of reachable stores sells every requested product.
    #[error("cannot cover all products with nearby shops")]
    CannotCoverProducts,

    /// No round trip visits every selected store.
    #[error("no route visits every selected store")]
    NoRoute,

    /// A consistency check failed after selection.
    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error("optimization was cancelled")]
    Cancelled,
}

impl OptimizeError {
    /// True for "no solution" outcomes, as opposed to failures.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::CannotCoverProducts | Self::NoRoute)
    }
}

impl From<TspError> for OptimizeError {
    fn from(err: TspError) -> Self {
        match err {
            TspError::NoPath => Self::NoRoute,
            TspError::InvalidInput(message) => Self::InvalidInput(message),
        }
    }
}
