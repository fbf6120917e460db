use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::algorithms::tsp::{DynamicProgrammingTsp, NO_EDGE};
use crate::algorithms::TspSolver;
use crate::config::OptimizerConfig;
use crate::error::OptimizeError;
use crate::models::{Location, Time};
use crate::services::{DurationService, TspRoute, TspService};
use crate::utils::cancel::CancellationToken;
use crate::utils::duration_fetch::{DurationBlock, DurationFetcher};

/// In-process [`TspService`]: fetches the duration matrix over the points and
/// solves it exactly with the DP solver.
pub struct MatrixTspService {
    durations: Arc<dyn DurationService>,
    config: OptimizerConfig,
}

impl MatrixTspService {
    pub fn new(durations: Arc<dyn DurationService>, config: OptimizerConfig) -> Self {
        Self { durations, config }
    }

    /// Square matrix of durations between `points`; unknown pairs are
    /// [`NO_EDGE`] and the diagonal is zero.
    fn duration_matrix(
        &self,
        points: &[Location],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<Time>>, OptimizeError> {
        let n = points.len();
        let mut matrix = vec![vec![NO_EDGE; n]; n];
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] = 0;
        }

        let blocks = [DurationBlock {
            sources: points,
            targets: points,
        }];
        let answers = DurationFetcher::new(self.durations.as_ref(), &self.config)
            .with_timeout(timeout)
            .fetch(&blocks, cancel)?;
        for entry in answers.into_iter().flatten() {
            if entry.source != entry.target {
                matrix[entry.source][entry.target] = entry.duration;
            }
        }
        Ok(matrix)
    }
}

impl TspService for MatrixTspService {
    fn solve(
        &self,
        points: &[Location],
        start: usize,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<TspRoute, OptimizeError> {
        let matrix = self.duration_matrix(points, timeout, cancel)?;
        let tour = DynamicProgrammingTsp.solve(&matrix, start)?;
        debug!("TSP over {} points: {:?} in {}s", points.len(), tour.order, tour.cost);

        Ok(TspRoute {
            order: tour.order,
            duration: tour.cost,
        })
    }
}
