// Chunked, parallel duration requests against a DurationService

use std::time::Duration;

use log::debug;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::config::OptimizerConfig;
use crate::error::{OptimizeError, UpstreamError};
use crate::models::{Location, Time};
use crate::services::{call_with_timeout, DurationService, RouteRow};
use crate::utils::cancel::CancellationToken;

const SERVICE: &str = "durations";

/// A sources-by-targets duration request of any size
#[derive(Debug, Clone, Copy)]
pub struct DurationBlock<'a> {
    pub sources: &'a [Location],
    pub targets: &'a [Location],
}

/// Duration between a source and a target of a block, by block index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationEntry {
    pub source: usize,
    pub target: usize,
    pub duration: Time,
}

/// A piece of a block small enough for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Chunk {
    block: usize,
    source_offset: usize,
    source_len: usize,
    target_offset: usize,
    target_len: usize,
}

/// Issues duration requests in chunks of at most `chunk_size` sources by
/// `chunk_size` targets, running up to `max_concurrent_requests` at once.
pub struct DurationFetcher<'a> {
    service: &'a dyn DurationService,
    config: &'a OptimizerConfig,
    timeout: Duration,
}

impl<'a> DurationFetcher<'a> {
    pub fn new(service: &'a dyn DurationService, config: &'a OptimizerConfig) -> Self {
        Self {
            service,
            config,
            timeout: config.request_timeout(),
        }
    }

    /// Use `timeout` for every request instead of the configured one
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch every block. The result holds one entry list per block, in
    /// block order, each sorted by chunk offset regardless of which request
    /// finished first. Any failed chunk fails the whole fetch.
    pub fn fetch(
        &self,
        blocks: &[DurationBlock<'_>],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<DurationEntry>>, OptimizeError> {
        let chunks: Vec<Chunk> = blocks
            .iter()
            .enumerate()
            .flat_map(|(index, block)| {
                plan_chunks(
                    index,
                    block.sources.len(),
                    block.targets.len(),
                    self.config.chunk_size,
                )
            })
            .collect();
        debug!(
            "Fetching durations for {} blocks in {} requests",
            blocks.len(),
            chunks.len()
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.max_concurrent_requests)
            .build()
            .map_err(|e| OptimizeError::Internal(format!("cannot start request pool: {e}")))?;

        let answers: Vec<Vec<DurationEntry>> = pool.install(|| {
            chunks
                .par_iter()
                .map(|chunk| self.fetch_chunk(blocks, chunk, cancel))
                .collect::<Result<Vec<_>, OptimizeError>>()
        })?;

        let mut merged = vec![Vec::new(); blocks.len()];
        for (chunk, entries) in chunks.iter().zip(answers) {
            merged[chunk.block].extend(entries);
        }
        Ok(merged)
    }

    fn fetch_chunk(
        &self,
        blocks: &[DurationBlock<'_>],
        chunk: &Chunk,
        cancel: &CancellationToken,
    ) -> Result<Vec<DurationEntry>, OptimizeError> {
        cancel.check()?;

        let block = &blocks[chunk.block];
        let sources = &block.sources[chunk.source_offset..chunk.source_offset + chunk.source_len];
        let targets = &block.targets[chunk.target_offset..chunk.target_offset + chunk.target_len];
        let timeout = self.timeout;

        let rows = call_with_timeout(SERVICE, timeout, || {
            self.service
                .durations_between(sources, targets, self.config.transport, timeout)
        })?;

        offset_rows(rows, chunk).map_err(OptimizeError::from)
    }
}

/// Split a block into request-sized chunks, sources outer, targets inner
fn plan_chunks(block: usize, sources: usize, targets: usize, size: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for source_offset in (0..sources).step_by(size) {
        for target_offset in (0..targets).step_by(size) {
            chunks.push(Chunk {
                block,
                source_offset,
                source_len: size.min(sources - source_offset),
                target_offset,
                target_len: size.min(targets - target_offset),
            });
        }
    }
    chunks
}

/// Translate chunk-local indices of a response into block indices
fn offset_rows(rows: Vec<RouteRow>, chunk: &Chunk) -> Result<Vec<DurationEntry>, UpstreamError> {
    let mut entries = Vec::new();
    for row in rows {
        if row.from >= chunk.source_len {
            return Err(malformed(format!(
                "source index {} outside a batch of {}",
                row.from, chunk.source_len
            )));
        }
        for route in row.routes {
            if route.to >= chunk.target_len {
                return Err(malformed(format!(
                    "target index {} outside a batch of {}",
                    route.to, chunk.target_len
                )));
            }
            if route.duration < 0 {
                return Err(malformed(format!("negative duration {}", route.duration)));
            }
            entries.push(DurationEntry {
                source: chunk.source_offset + row.from,
                target: chunk.target_offset + route.to,
                duration: route.duration,
            });
        }
    }
    Ok(entries)
}

fn malformed(message: String) -> UpstreamError {
    UpstreamError::Malformed {
        service: SERVICE,
        message,
    }
}
