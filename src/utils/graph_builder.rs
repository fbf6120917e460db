use log::info;

use crate::config::OptimizerConfig;
use crate::error::OptimizeError;
use crate::models::{CandidateSet, Location, LocationId, USER_NODE_ID};
use crate::services::DurationService;
use crate::utils::cancel::CancellationToken;
use crate::utils::duration_fetch::{DurationBlock, DurationFetcher};
use crate::utils::duration_graph::DurationGraph;

/// Builds the duration graph between candidate locations and the user.
///
/// Durations are requested for every ordered pair of distinct brand groups
/// and between the user and every group, in both directions. Addresses of the
/// same brand get no edges between each other: the search never visits a
/// brand twice.
pub struct GraphBuilder<'a> {
    fetcher: DurationFetcher<'a>,
}

/// Ids on both sides of a block, so entries can be mapped back to nodes
struct BlockIds<'a> {
    sources: &'a [LocationId],
    targets: &'a [LocationId],
}

impl<'a> GraphBuilder<'a> {
    pub fn new(service: &'a dyn DurationService, config: &'a OptimizerConfig) -> Self {
        Self {
            fetcher: DurationFetcher::new(service, config),
        }
    }

    /// Request all durations and assemble the graph. Fails as a whole when
    /// any request fails.
    pub fn build(
        &self,
        candidates: &CandidateSet,
        user_point: Location,
        cancel: &CancellationToken,
    ) -> Result<DurationGraph, OptimizeError> {
        let groups = candidates.groups();
        let points: Vec<Vec<Location>> = groups.iter().map(|group| group.points()).collect();
        let ids: Vec<Vec<LocationId>> = groups
            .iter()
            .map(|group| group.places.iter().map(|place| place.id.clone()).collect())
            .collect();
        let user_points = [user_point];
        let user_ids = [USER_NODE_ID.to_string()];

        let mut blocks = Vec::new();
        let mut block_ids = Vec::new();
        for i in 0..groups.len() {
            for j in 0..groups.len() {
                if i == j {
                    continue;
                }
                blocks.push(DurationBlock {
                    sources: &points[i],
                    targets: &points[j],
                });
                block_ids.push(BlockIds {
                    sources: &ids[i],
                    targets: &ids[j],
                });
            }
        }
        for (group_points, group_ids) in points.iter().zip(&ids) {
            blocks.push(DurationBlock {
                sources: &user_points,
                targets: group_points,
            });
            block_ids.push(BlockIds {
                sources: &user_ids,
                targets: group_ids,
            });
            blocks.push(DurationBlock {
                sources: group_points,
                targets: &user_points,
            });
            block_ids.push(BlockIds {
                sources: group_ids,
                targets: &user_ids,
            });
        }

        let answers = self.fetcher.fetch(&blocks, cancel)?;

        let mut graph = DurationGraph::new();
        for group_ids in &ids {
            for id in group_ids {
                graph.ensure_node(id);
            }
        }
        for (entries, names) in answers.iter().zip(&block_ids) {
            for entry in entries {
                graph.insert(
                    &names.sources[entry.source],
                    &names.targets[entry.target],
                    entry.duration,
                );
            }
        }

        info!(
            "Built duration graph with {} nodes and {} edges from {} brand groups",
            graph.node_count(),
            graph.edge_count(),
            groups.len()
        );
        Ok(graph)
    }
}
