//! External collaborators of the optimizer and the optimization pipeline.
//!
//! The engine consumes four capabilities: a nearby-shops lookup, a
//! point-to-point duration service, a product price catalog and a TSP
//! solver over points. Each is a trait here so that deployments can plug in
//! network clients while tests and the CLI use the in-memory versions in
//! [`memory`]. Every call receives the caller's timeout, and implementations
//! are expected to give up once it has passed.

pub mod memory;
pub mod optimizer;
pub mod tsp;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::TransportMode;
use crate::error::{OptimizeError, UpstreamError};
use crate::models::{Location, ProductQuotes, ShopGroup, Time};
use crate::utils::cancel::CancellationToken;

pub use self::optimizer::{OptimizeRequest, Optimizer, Strategy};
pub use self::tsp::MatrixTspService;

/// Durations from one source to the reachable targets of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRow {
    /// Index into the request's sources
    pub from: usize,
    pub routes: Vec<RouteTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTime {
    /// Index into the request's targets
    pub to: usize,
    /// Travel time in seconds
    pub duration: Time,
}

/// Visiting order over a list of points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TspRoute {
    /// Point indices, starting and ending at the start index
    pub order: Vec<usize>,
    /// Round-trip duration in seconds
    pub duration: Time,
}

/// Nearby-shops lookup
pub trait ShopDirectory: Send + Sync {
    /// Shops within `radius` meters of `point`, grouped by brand
    fn nearby_shops(
        &self,
        point: Location,
        radius: i64,
        timeout: Duration,
    ) -> Result<Vec<ShopGroup>, UpstreamError>;
}

/// Point-to-point travel durations.
///
/// Implementations accept at most [`crate::config::MAX_CHUNK_SIZE`] sources
/// and targets per call; callers chunk larger requests.
pub trait DurationService: Send + Sync {
    fn durations_between(
        &self,
        sources: &[Location],
        targets: &[Location],
        mode: TransportMode,
        timeout: Duration,
    ) -> Result<Vec<RouteRow>, UpstreamError>;
}

/// Product price lookup
pub trait PriceCatalog: Send + Sync {
    /// Prices of the products named `names` in `category`. Products the
    /// catalog does not know are simply absent from the answer.
    fn price_quotes(
        &self,
        category: &str,
        names: &[String],
        timeout: Duration,
    ) -> Result<Vec<ProductQuotes>, UpstreamError>;
}

/// Round-trip ordering of points
pub trait TspService: Send + Sync {
    /// Implementations that make further external calls stop issuing them
    /// once `cancel` fires.
    fn solve(
        &self,
        points: &[Location],
        start: usize,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<TspRoute, OptimizeError>;
}

/// Run an external call, turning an answer that arrives after `timeout`
/// into [`UpstreamError::Timeout`].
///
/// The call itself is not interrupted: the collaborator receives `timeout`
/// and must enforce it. This only keeps a late answer from being used.
pub(crate) fn call_with_timeout<T, F>(
    service: &'static str,
    timeout: Duration,
    call: F,
) -> Result<T, UpstreamError>
where
    F: FnOnce() -> Result<T, UpstreamError>,
{
    let started = Instant::now();
    let result = call()?;
    if started.elapsed() > timeout {
        return Err(UpstreamError::Timeout { service, timeout });
    }
    Ok(result)
}
