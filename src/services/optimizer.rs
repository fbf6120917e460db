//! The optimization pipeline.
//!
//! A call collects prices, finds nearby shops of brands that sell something
//! from the list, builds the duration graph between them, selects stores and
//! orders them into a round trip. Every call starts from scratch and shares
//! no state with other calls.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::algorithms::finalizer::OrderFinalizer;
use crate::algorithms::nearest_coverage::NearestCoverageSelector;
use crate::algorithms::price_optimal::PriceOptimalSelector;
use crate::algorithms::search_state::{PriceTable, SearchContext};
use crate::algorithms::StoreSelector;
use crate::config::OptimizerConfig;
use crate::error::OptimizeError;
use crate::models::{
    CandidateSet, Location, OptimizationResult, Price, PriceQuote, ProductRequirement,
};
use crate::services::{
    call_with_timeout, DurationService, PriceCatalog, ShopDirectory, TspService,
};
use crate::utils::cancel::CancellationToken;
use crate::utils::graph_builder::GraphBuilder;

/// Input of one optimization call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    pub requirements: Vec<ProductRequirement>,

    /// Brands whose discount card the customer holds
    #[serde(default)]
    pub discount_brands: Vec<String>,

    pub user_point: Location,

    /// Search radius around the user in meters
    pub radius: i64,

    /// Value of six seconds of travel in minor currency units
    pub exchange_rate: i64,
}

/// Which selector picks the stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Minimum price plus time valued at the exchange rate
    #[default]
    PriceOptimal,
    /// Shortest trip covering the list, ignoring prices
    NearestCoverage,
}

pub struct Optimizer {
    shops: Arc<dyn ShopDirectory>,
    durations: Arc<dyn DurationService>,
    prices: Arc<dyn PriceCatalog>,
    tsp: Arc<dyn TspService>,
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(
        shops: Arc<dyn ShopDirectory>,
        durations: Arc<dyn DurationService>,
        prices: Arc<dyn PriceCatalog>,
        tsp: Arc<dyn TspService>,
        config: OptimizerConfig,
    ) -> Result<Self, OptimizeError> {
        config.validate()?;
        Ok(Self {
            shops,
            durations,
            prices,
            tsp,
            config,
        })
    }

    /// Cheapest (or, with [`Strategy::NearestCoverage`], quickest) shopping
    /// trip covering every requirement.
    pub fn optimize(
        &self,
        request: &OptimizeRequest,
        strategy: Strategy,
        cancel: &CancellationToken,
    ) -> Result<OptimizationResult, OptimizeError> {
        validate_request(request)?;
        cancel.check()?;

        let quotes = self.collect_quotes(request, cancel)?;
        cancel.check()?;

        let timeout = self.config.request_timeout();
        let groups = call_with_timeout("shops", timeout, || {
            self.shops
                .nearby_shops(request.user_point, request.radius, timeout)
        })?;
        let selling: HashSet<&str> = quotes
            .iter()
            .flatten()
            .map(|quote| quote.store_brand.as_str())
            .collect();
        let candidates = CandidateSet::from_groups(groups, |brand| selling.contains(brand));
        info!(
            "Found {} candidate shops of {} brands within {}m",
            candidates.location_count(),
            candidates.brands().len(),
            request.radius
        );

        let prices = PriceTable::new(&request.requirements, &quotes, &candidates);
        let uncovered = prices.uncovered();
        if !uncovered.is_empty() {
            info!(
                "No nearby shop sells {:?}",
                uncovered
                    .iter()
                    .map(|&i| request.requirements[i].name.as_str())
                    .collect::<Vec<_>>()
            );
            return Err(OptimizeError::CannotCoverProducts);
        }
        cancel.check()?;

        let graph = GraphBuilder::new(self.durations.as_ref(), &self.config).build(
            &candidates,
            request.user_point,
            cancel,
        )?;
        cancel.check()?;

        let context = SearchContext::new(&graph, &candidates, &prices, request.exchange_rate)?;
        let selector: &dyn StoreSelector = match strategy {
            Strategy::PriceOptimal => &PriceOptimalSelector,
            Strategy::NearestCoverage => &NearestCoverageSelector,
        };
        let selection = selector.select(&context, cancel)?;
        cancel.check()?;

        let result = OrderFinalizer::new(self.tsp.as_ref(), timeout).finalize(
            &selection,
            &request.requirements,
            request.user_point,
            request.exchange_rate,
            cancel,
        )?;
        cancel.check()?;
        Ok(result)
    }

    /// Quotes per requirement, in requirement order: one catalog call per
    /// category, the discount price for brands in the customer's cards and
    /// the minimum per brand.
    fn collect_quotes(
        &self,
        request: &OptimizeRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<PriceQuote>>, OptimizeError> {
        let cards: HashSet<String> = request.discount_brands.iter().cloned().collect();
        let timeout = self.config.request_timeout();

        let mut by_category: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for requirement in &request.requirements {
            let names = by_category.entry(requirement.category.as_str()).or_default();
            if !names.contains(&requirement.name) {
                names.push(requirement.name.clone());
            }
        }

        let mut found: HashMap<(String, String), BTreeMap<String, Price>> = HashMap::new();
        for (category, names) in &by_category {
            cancel.check()?;
            let answer = call_with_timeout("prices", timeout, || {
                self.prices.price_quotes(category, names, timeout)
            })?;
            for product in answer {
                let best = found
                    .entry((product.category.clone(), product.name.clone()))
                    .or_default();
                for price in &product.prices {
                    let quote = price.quote(&cards);
                    best.entry(quote.store_brand)
                        .and_modify(|current| *current = (*current).min(quote.price))
                        .or_insert(quote.price);
                }
            }
        }

        let quotes: Vec<Vec<PriceQuote>> = request
            .requirements
            .iter()
            .map(|requirement| {
                found
                    .get(&(requirement.category.clone(), requirement.name.clone()))
                    .map(|brands| {
                        brands
                            .iter()
                            .map(|(brand, &price)| PriceQuote {
                                price,
                                store_brand: brand.clone(),
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect();
        info!(
            "Collected price quotes for {}/{} products in {} categories",
            quotes.iter().filter(|q| !q.is_empty()).count(),
            quotes.len(),
            by_category.len()
        );
        Ok(quotes)
    }
}

fn validate_request(request: &OptimizeRequest) -> Result<(), OptimizeError> {
    if request.requirements.is_empty() {
        return Err(OptimizeError::InvalidInput(
            "requirement list is empty".to_string(),
        ));
    }
    if let Some(requirement) = request.requirements.iter().find(|req| req.amount <= 0) {
        return Err(OptimizeError::InvalidInput(format!(
            "amount of {} must be positive, got {}",
            requirement.name, requirement.amount
        )));
    }
    if request.exchange_rate < 0 {
        return Err(OptimizeError::InvalidInput(format!(
            "exchange rate must not be negative, got {}",
            request.exchange_rate
        )));
    }
    if request.radius <= 0 {
        return Err(OptimizeError::InvalidInput(format!(
            "radius must be positive, got {}",
            request.radius
        )));
    }
    Ok(())
}
