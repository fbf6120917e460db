use std::cmp::Ordering;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::algorithms::TspSolver;
use crate::error::TspError;
use crate::models::Time;

/// Sentinel for a missing edge in a cost matrix
pub const NO_EDGE: Time = -1;

/// Largest matrix the permutation solver accepts
pub const MAX_BRUTEFORCE_NODES: usize = 11;

/// Largest matrix the bitmask solver accepts
pub const MAX_DP_NODES: usize = 16;

/// An optimal round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tour {
    pub cost: Time,
    /// Node indices, first and last being the start node
    pub order: Vec<usize>,
}

/// Exact solver enumerating permutations of the non-start nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceTsp;

/// Exact solver using the bitmask dynamic program over (visited set, last node)
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicProgrammingTsp;

impl TspSolver for BruteForceTsp {
    fn solve(&self, matrix: &[Vec<Time>], start: usize) -> Result<Tour, TspError> {
        validate(matrix, start, MAX_BRUTEFORCE_NODES)?;

        let mut perm: Vec<usize> = (0..matrix.len()).filter(|&node| node != start).collect();
        let mut best: Option<(Time, Vec<usize>)> = None;

        loop {
            if let Some(cost) = cycle_cost(matrix, start, &perm) {
                // Permutations come in lexicographic order, so the first
                // minimum wins ties.
                if best.as_ref().map_or(true, |(best_cost, _)| cost < *best_cost) {
                    best = Some((cost, perm.clone()));
                }
            }
            if !next_permutation(&mut perm) {
                break;
            }
        }

        let (cost, perm) = best.ok_or(TspError::NoPath)?;
        Ok(Tour {
            cost,
            order: close_cycle(start, perm),
        })
    }
}

impl TspSolver for DynamicProgrammingTsp {
    fn solve(&self, matrix: &[Vec<Time>], start: usize) -> Result<Tour, TspError> {
        validate(matrix, start, MAX_DP_NODES)?;

        let n = matrix.len();
        let full = (1usize << n) - 1;
        let mut table = PathTable::new(n, start);

        for mask in 1..=full {
            if mask & (1 << start) == 0 {
                continue;
            }
            for last in 0..n {
                let Some(cost) = table.cost(mask, last) else {
                    continue;
                };
                for next in 0..n {
                    if mask & (1 << next) != 0 || matrix[last][next] == NO_EDGE {
                        continue;
                    }
                    table.relax(mask, last, next, cost + matrix[last][next]);
                }
            }
        }

        let mut best: Option<(Time, Vec<usize>)> = None;
        for last in (0..n).filter(|&node| node != start) {
            let Some(cost) = table.cost(full, last) else {
                continue;
            };
            if matrix[last][start] == NO_EDGE {
                continue;
            }
            let total = cost + matrix[last][start];
            let better = match &best {
                None => true,
                Some((best_cost, best_path)) => match total.cmp(best_cost) {
                    Ordering::Less => true,
                    Ordering::Equal => table.path(full, last) < *best_path,
                    Ordering::Greater => false,
                },
            };
            if better {
                best = Some((total, table.path(full, last)));
            }
        }

        let (cost, path) = best.ok_or(TspError::NoPath)?;
        debug!("DP tour over {} nodes costs {}", n, cost);
        Ok(Tour {
            cost,
            order: close_cycle(start, path),
        })
    }
}

/// Minimum path costs and parents per (visited mask, last node).
///
/// Among equally cheap paths the lexicographically smallest node sequence is
/// kept, so the final tour matches the first optimum in permutation order.
struct PathTable {
    n: usize,
    start: usize,
    cost: Vec<Option<Time>>,
    parent: Vec<usize>,
}

impl PathTable {
    fn new(n: usize, start: usize) -> Self {
        let mut cost = vec![None; (1 << n) * n];
        cost[(1 << start) * n + start] = Some(0);
        Self {
            n,
            start,
            cost,
            parent: vec![start; (1 << n) * n],
        }
    }

    fn cost(&self, mask: usize, last: usize) -> Option<Time> {
        self.cost[mask * self.n + last]
    }

    fn relax(&mut self, mask: usize, last: usize, next: usize, cost: Time) {
        let slot = (mask | (1 << next)) * self.n + next;
        let better = match self.cost[slot] {
            None => true,
            Some(current) => match cost.cmp(&current) {
                Ordering::Less => true,
                Ordering::Equal => {
                    let prev = self.parent[slot];
                    self.path(mask, last) < self.path(mask, prev)
                }
                Ordering::Greater => false,
            },
        };
        if better {
            self.cost[slot] = Some(cost);
            self.parent[slot] = last;
        }
    }

    /// Nodes after the start up to and including `last`
    fn path(&self, mut mask: usize, mut last: usize) -> Vec<usize> {
        let mut path = Vec::new();
        while last != self.start {
            path.push(last);
            let prev = self.parent[mask * self.n + last];
            mask ^= 1 << last;
            last = prev;
        }
        path.reverse();
        path
    }
}

fn validate(matrix: &[Vec<Time>], start: usize, max_nodes: usize) -> Result<(), TspError> {
    let n = matrix.len();
    if n < 2 {
        return Err(TspError::InvalidInput(format!(
            "matrix must have at least 2 nodes, got {n}"
        )));
    }
    if n > max_nodes {
        return Err(TspError::InvalidInput(format!(
            "matrix of {n} nodes exceeds the limit of {max_nodes}"
        )));
    }
    if let Some(row) = matrix.iter().position(|row| row.len() != n) {
        return Err(TspError::InvalidInput(format!(
            "row {row} has {} entries, expected {n}",
            matrix[row].len()
        )));
    }
    if start >= n {
        return Err(TspError::InvalidInput(format!(
            "start node {start} is outside a matrix of {n} nodes"
        )));
    }
    for (i, row) in matrix.iter().enumerate() {
        for (j, &cost) in row.iter().enumerate() {
            if i != j && cost < NO_EDGE {
                return Err(TspError::InvalidInput(format!(
                    "negative cost {cost} at ({i}, {j})"
                )));
            }
        }
    }
    Ok(())
}

/// Cost of start -> perm... -> start, or None when an edge is missing
fn cycle_cost(matrix: &[Vec<Time>], start: usize, perm: &[usize]) -> Option<Time> {
    let mut cost = 0;
    let mut current = start;
    for &next in perm.iter().chain(std::iter::once(&start)) {
        let edge = matrix[current][next];
        if edge == NO_EDGE {
            return None;
        }
        cost += edge;
        current = next;
    }
    Some(cost)
}

/// Rearranges `items` into the next lexicographic permutation. Returns false
/// when `items` already is the last one.
fn next_permutation(items: &mut [usize]) -> bool {
    if items.len() < 2 {
        return false;
    }
    let Some(pivot) = (0..items.len() - 1).rev().find(|&i| items[i] < items[i + 1]) else {
        return false;
    };
    let mut successor = items.len() - 1;
    while items[successor] <= items[pivot] {
        successor -= 1;
    }
    items.swap(pivot, successor);
    items[pivot + 1..].reverse();
    true
}

fn close_cycle(start: usize, path: Vec<usize>) -> Vec<usize> {
    let mut order = Vec::with_capacity(path.len() + 2);
    order.push(start);
    order.extend(path);
    order.push(start);
    order
}
