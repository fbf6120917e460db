use std::cmp::Reverse;
use std::collections::HashSet;

use log::{debug, info, warn};
use petgraph::graph::NodeIndex;
use priority_queue::PriorityQueue;

use crate::algorithms::search_state::{BrandSet, SearchContext, Selection, StateArena, StateId};
use crate::algorithms::StoreSelector;
use crate::error::OptimizeError;
use crate::models::Time;
use crate::utils::cancel::CancellationToken;

/// Time-shortest selector ignoring prices.
///
/// Dijkstra-style search from the user over (node, visited brands). The
/// first state popped with every product available wins; its duration then
/// includes the way back to the user.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestCoverageSelector;

impl StoreSelector for NearestCoverageSelector {
    fn select(
        &self,
        context: &SearchContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<Selection, OptimizeError> {
        let graph = context.graph;
        let user = graph.user();

        let mut arena = StateArena::new();
        // Equal durations pop in insertion order
        let mut queue: PriorityQueue<StateId, Reverse<(Time, u64)>> = PriorityQueue::new();
        let mut pushed: u64 = 0;
        let mut settled: HashSet<(NodeIndex, BrandSet)> = HashSet::new();

        let root = arena.push(context.initial_state());
        queue.push(root, Reverse((0, pushed)));

        while let Some((id, Reverse((duration, _)))) = queue.pop() {
            cancel.check()?;
            let state = arena.get(id);
            if !settled.insert((state.node, state.visited)) {
                continue;
            }
            debug!(
                "State at {}: {}s, {} products",
                graph.id(state.node),
                duration,
                state.filled()
            );

            if state.is_full() {
                match context.return_duration(state) {
                    Some(back) => {
                        let selection = context.selection(&arena, id, back)?;
                        info!(
                            "Nearest-coverage selection: {} stores, price {}, {}s",
                            selection.stores.len(),
                            selection.total_price,
                            selection.duration
                        );
                        return Ok(selection);
                    }
                    None => {
                        warn!("No route from {} to user point", graph.id(state.node));
                        continue;
                    }
                }
            }

            let mut edges: Vec<_> = graph.outgoing(state.node).collect();
            edges.sort_unstable();
            let next_states: Vec<_> = edges
                .into_iter()
                .filter(|&(to, _)| to != user)
                .filter_map(|(to, secs)| context.expand(state, id, to, secs))
                .filter(|next| !settled.contains(&(next.node, next.visited)))
                .collect();

            for next in next_states {
                let priority = next.duration;
                let next_id = arena.push(next);
                pushed += 1;
                queue.push(next_id, Reverse((priority, pushed)));
            }
        }

        Err(OptimizeError::CannotCoverProducts)
    }
}
