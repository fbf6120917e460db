use std::cmp::Ordering;
use std::collections::HashMap;

use log::{debug, info, warn};
use petgraph::graph::NodeIndex;

use crate::algorithms::search_state::{SearchContext, SearchState, Selection, StateArena, StateId};
use crate::algorithms::StoreSelector;
use crate::config::PRICE_TIE_BREAK_EXCHANGE_LIMIT;
use crate::error::OptimizeError;
use crate::utils::cancel::CancellationToken;

/// Minimum combined-cost selector.
///
/// Keeps one state per node and relaxes every edge in full passes until a
/// pass changes nothing. A state reaching a node replaces the one stored
/// there when [`supersedes`] holds. Brands are never revisited along a path,
/// so only finitely many states exist and every replacement is a strict
/// improvement, which bounds the number of passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceOptimalSelector;

impl StoreSelector for PriceOptimalSelector {
    fn select(
        &self,
        context: &SearchContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<Selection, OptimizeError> {
        let graph = context.graph;
        let user = graph.user();

        let mut arena = StateArena::new();
        let mut best: HashMap<NodeIndex, StateId> = HashMap::new();
        best.insert(user, arena.push(context.initial_state()));

        let mut passes = 0;
        loop {
            cancel.check()?;
            passes += 1;
            let mut updated = false;

            for from in graph.node_indices() {
                let Some(&current) = best.get(&from) else {
                    continue;
                };
                let mut edges: Vec<_> = graph.outgoing(from).collect();
                edges.sort_unstable();

                for (to, duration) in edges {
                    if to == user {
                        continue;
                    }
                    let Some(candidate) = context.expand(arena.get(current), current, to, duration)
                    else {
                        continue;
                    };

                    let accept = match best.get(&to) {
                        None => true,
                        Some(&old) => {
                            supersedes(&candidate, arena.get(old), context.exchange_rate)
                        }
                    };
                    if accept {
                        debug!(
                            "Updated state for {}: {} products, {}s, price {}",
                            graph.id(to),
                            candidate.filled(),
                            candidate.duration,
                            candidate.total_price
                        );
                        best.insert(to, arena.push(candidate));
                        updated = true;
                    }
                }
            }

            if !updated {
                break;
            }
        }
        debug!("Relaxation settled after {passes} passes, {} states", arena.len());

        let mut winner: Option<(StateId, SearchState)> = None;
        let mut nodes: Vec<_> = best.iter().filter(|(&node, _)| node != user).collect();
        nodes.sort_unstable();
        for (_, &id) in nodes {
            let state = arena.get(id);
            if !state.is_full() {
                continue;
            }
            let Some(back) = context.return_duration(state) else {
                warn!(
                    "No route between shop with id={} and user point",
                    graph.id(state.node)
                );
                continue;
            };
            let mut closed = state.clone();
            closed.duration += back;
            let better = match &winner {
                None => true,
                Some((_, incumbent)) => {
                    compare_full(&closed, incumbent, context.exchange_rate) == Ordering::Less
                }
            };
            if better {
                winner = Some((id, closed));
            }
        }

        let (id, closed) = winner.ok_or(OptimizeError::CannotCoverProducts)?;
        let back = closed.duration - arena.get(id).duration;
        let selection = context.selection(&arena, id, back)?;
        info!(
            "Price-optimal selection: {} stores, price {}, {}s",
            selection.stores.len(),
            selection.total_price,
            selection.duration
        );
        Ok(selection)
    }
}

/// Whether `candidate` should replace `incumbent` at the same node.
///
/// A full state beats a partial one. Two partial states compare by filled
/// products, then duration. Two full states compare by combined cost, then
/// by price or duration depending on the exchange rate.
pub fn supersedes(candidate: &SearchState, incumbent: &SearchState, exchange_rate: i64) -> bool {
    match (candidate.is_full(), incumbent.is_full()) {
        (false, false) => {
            candidate.filled() > incumbent.filled()
                || (candidate.filled() == incumbent.filled()
                    && candidate.duration < incumbent.duration)
        }
        (true, false) => true,
        (false, true) => false,
        (true, true) => compare_full(candidate, incumbent, exchange_rate) == Ordering::Less,
    }
}

/// Orders full states by combined cost; equal costs prefer the lower price
/// up to [`PRICE_TIE_BREAK_EXCHANGE_LIMIT`] and the shorter duration above it.
fn compare_full(a: &SearchState, b: &SearchState, exchange_rate: i64) -> Ordering {
    let cost_a = a.combined_cost(exchange_rate);
    let cost_b = b.combined_cost(exchange_rate);
    cost_a.cmp(&cost_b).then_with(|| {
        if exchange_rate <= PRICE_TIE_BREAK_EXCHANGE_LIMIT {
            a.total_price.cmp(&b.total_price)
        } else {
            a.duration.cmp(&b.duration)
        }
    })
}
