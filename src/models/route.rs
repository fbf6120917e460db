// Route models for representing the final shopping trip

use crate::models::{Cost, Location, Price, ProductRequirement, Time};
use serde::{Deserialize, Serialize};

/// A product bought at a particular store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchasedProduct {
    pub product: ProductRequirement,

    /// Unit price multiplied by the requested amount
    pub price: Price,
}

/// One stop of the shopping trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreVisit {
    /// Display name of the address
    pub store: String,
    pub brand: String,
    pub point: Location,
    pub products: Vec<PurchasedProduct>,

    /// Sum of the prices of `products`
    pub subtotal: Price,
}

/// Stores to visit in order, with what to buy and what it costs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub stores: Vec<StoreVisit>,
    pub total_price: Price,

    /// Total price plus the trip duration valued at the exchange rate
    pub total_cost: Cost,

    /// Round-trip duration of the visiting order in seconds
    pub duration: Time,
}

impl OptimizationResult {
    /// Number of product lines bought across all stores
    pub fn product_count(&self) -> usize {
        self.stores.iter().map(|visit| visit.products.len()).sum()
    }
}
