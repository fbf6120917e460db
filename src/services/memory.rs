// In-memory collaborators backed by JSON fixtures

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{OptimizerConfig, TransportMode};
use crate::error::{OptimizeError, UpstreamError};
use crate::models::{Location, ProductQuotes, ShopGroup, Time};
use crate::services::optimizer::{OptimizeRequest, Optimizer};
use crate::services::{
    DurationService, MatrixTspService, PriceCatalog, RouteRow, RouteTime, ShopDirectory,
};

/// Fixed list of shops, filtered by distance from the query point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticShops {
    pub groups: Vec<ShopGroup>,
}

impl StaticShops {
    pub fn new(groups: Vec<ShopGroup>) -> Self {
        Self { groups }
    }
}

impl ShopDirectory for StaticShops {
    fn nearby_shops(
        &self,
        point: Location,
        radius: i64,
        _timeout: Duration,
    ) -> Result<Vec<ShopGroup>, UpstreamError> {
        let groups: Vec<ShopGroup> = self
            .groups
            .iter()
            .map(|group| {
                ShopGroup::new(
                    group.brand.clone(),
                    group
                        .places
                        .iter()
                        .filter(|place| place.point.distance_to(&point) <= radius as f64)
                        .cloned()
                        .collect(),
                )
            })
            .filter(|group| !group.places.is_empty())
            .collect();
        debug!("{} shop groups within {}m", groups.len(), radius);
        Ok(groups)
    }
}

/// Known duration between two points; `None` marks a pair without a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedRoute {
    pub from: Location,
    pub to: Location,
    pub duration: Option<Time>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct DurationTable {
    #[serde(default)]
    speed_mps: Option<f64>,
    #[serde(default)]
    routes: Vec<FixedRoute>,
}

type PointKey = (u64, u64);

fn point_key(point: &Location) -> PointKey {
    (point.lon.to_bits(), point.lat.to_bits())
}

/// Durations from a table of fixed routes, falling back to great-circle
/// distance over a constant speed when one is configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "DurationTable", into = "DurationTable")]
pub struct StaticDurations {
    speed_mps: Option<f64>,
    routes: Vec<FixedRoute>,
    index: HashMap<(PointKey, PointKey), Option<Time>>,
}

impl From<DurationTable> for StaticDurations {
    fn from(table: DurationTable) -> Self {
        let index = table
            .routes
            .iter()
            .map(|route| ((point_key(&route.from), point_key(&route.to)), route.duration))
            .collect();
        Self {
            speed_mps: table.speed_mps,
            routes: table.routes,
            index,
        }
    }
}

impl From<StaticDurations> for DurationTable {
    fn from(durations: StaticDurations) -> Self {
        Self {
            speed_mps: durations.speed_mps,
            routes: durations.routes,
        }
    }
}

impl StaticDurations {
    pub fn new(speed_mps: Option<f64>, routes: Vec<FixedRoute>) -> Self {
        DurationTable { speed_mps, routes }.into()
    }

    /// Every pair at a constant speed in meters per second
    pub fn at_speed(speed_mps: f64) -> Self {
        Self::new(Some(speed_mps), Vec::new())
    }

    pub fn duration(&self, from: &Location, to: &Location) -> Option<Time> {
        if let Some(&fixed) = self.index.get(&(point_key(from), point_key(to))) {
            return fixed;
        }
        let speed = self.speed_mps.filter(|speed| *speed > 0.0)?;
        Some((from.distance_to(to) / speed).round() as Time)
    }
}

impl DurationService for StaticDurations {
    fn durations_between(
        &self,
        sources: &[Location],
        targets: &[Location],
        _mode: TransportMode,
        _timeout: Duration,
    ) -> Result<Vec<RouteRow>, UpstreamError> {
        Ok(sources
            .iter()
            .enumerate()
            .map(|(from, source)| RouteRow {
                from,
                routes: targets
                    .iter()
                    .enumerate()
                    .filter_map(|(to, target)| {
                        self.duration(source, target)
                            .map(|duration| RouteTime { to, duration })
                    })
                    .collect(),
            })
            .collect())
    }
}

/// Fixed price catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticPrices {
    pub products: Vec<ProductQuotes>,
}

impl StaticPrices {
    pub fn new(products: Vec<ProductQuotes>) -> Self {
        Self { products }
    }
}

impl PriceCatalog for StaticPrices {
    fn price_quotes(
        &self,
        category: &str,
        names: &[String],
        _timeout: Duration,
    ) -> Result<Vec<ProductQuotes>, UpstreamError> {
        Ok(self
            .products
            .iter()
            .filter(|product| product.category == category && names.contains(&product.name))
            .cloned()
            .collect())
    }
}

/// A request together with the world it runs against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub request: OptimizeRequest,
    #[serde(default)]
    pub shops: StaticShops,
    #[serde(default)]
    pub durations: StaticDurations,
    #[serde(default)]
    pub prices: StaticPrices,
}

impl Fixture {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, OptimizeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            OptimizeError::InvalidInput(format!("cannot read fixture {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            OptimizeError::InvalidInput(format!("cannot parse fixture {}: {e}", path.display()))
        })
    }

    /// Optimizer over the fixture's collaborators, solving the visiting order
    /// over the fixture's durations.
    pub fn optimizer(&self, config: OptimizerConfig) -> Result<Optimizer, OptimizeError> {
        let durations = Arc::new(self.durations.clone());
        Optimizer::new(
            Arc::new(self.shops.clone()),
            durations.clone(),
            Arc::new(self.prices.clone()),
            Arc::new(MatrixTspService::new(durations, config.clone())),
            config,
        )
    }
}
