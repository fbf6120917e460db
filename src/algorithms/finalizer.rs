use std::time::Duration;

use log::info;

use crate::algorithms::search_state::Selection;
use crate::algorithms::tsp::MAX_DP_NODES;
use crate::error::OptimizeError;
use crate::models::{
    combined_cost, Location, OptimizationResult, ProductRequirement, PurchasedProduct,
    StoreVisit,
};
use crate::services::TspService;
use crate::utils::cancel::CancellationToken;

/// Most stores a route can visit: the round trip also holds the user point
pub const MAX_ROUTE_STORES: usize = MAX_DP_NODES - 1;

/// Orders the selected stores into a round trip from the user and attributes
/// each purchase to the store of its brand.
pub struct OrderFinalizer<'a> {
    tsp: &'a dyn TspService,
    timeout: Duration,
}

impl<'a> OrderFinalizer<'a> {
    pub fn new(tsp: &'a dyn TspService, timeout: Duration) -> Self {
        Self { tsp, timeout }
    }

    pub fn finalize(
        &self,
        selection: &Selection,
        requirements: &[ProductRequirement],
        user_point: Location,
        exchange_rate: i64,
        cancel: &CancellationToken,
    ) -> Result<OptimizationResult, OptimizeError> {
        if selection.purchases.len() != requirements.len() {
            return Err(OptimizeError::Internal(format!(
                "{} purchases for {} requirements",
                selection.purchases.len(),
                requirements.len()
            )));
        }

        let store_count = selection.stores.len();
        if store_count > MAX_ROUTE_STORES {
            return Err(OptimizeError::InvalidInput(format!(
                "covering the list takes {store_count} stores, \
                 a route visits at most {MAX_ROUTE_STORES}"
            )));
        }

        let mut points = Vec::with_capacity(store_count + 1);
        points.push(user_point);
        points.extend(selection.stores.iter().map(|store| store.point));

        let route = self.tsp.solve(&points, 0, self.timeout, cancel)?;
        if route.order.len() != store_count + 2 {
            return Err(OptimizeError::Internal(format!(
                "unexpected len of tsp points: actual={}, expected={}",
                route.order.len(),
                store_count + 2
            )));
        }

        let mut seen = vec![false; store_count];
        let mut stores = Vec::with_capacity(store_count);
        let mut total_price = 0;
        for &point in &route.order[1..route.order.len() - 1] {
            if point == 0 || point > store_count || seen[point - 1] {
                return Err(OptimizeError::Internal(format!(
                    "tsp order {:?} is not a tour over {} stores",
                    route.order, store_count
                )));
            }
            seen[point - 1] = true;

            let store = &selection.stores[point - 1];
            let products: Vec<PurchasedProduct> = requirements
                .iter()
                .zip(&selection.purchases)
                .filter(|(_, slot)| slot.brand == store.brand)
                .map(|(requirement, slot)| PurchasedProduct {
                    product: requirement.clone(),
                    price: slot.price * requirement.amount,
                })
                .collect();
            let subtotal = products.iter().map(|product| product.price).sum();
            total_price += subtotal;

            stores.push(StoreVisit {
                store: store.display_name.clone(),
                brand: store.store_brand.clone(),
                point: store.point,
                products,
                subtotal,
            });
        }

        let result = OptimizationResult {
            stores,
            total_price,
            total_cost: combined_cost(total_price, route.duration, exchange_rate),
            duration: route.duration,
        };
        info!(
            "Finalized route over {} stores: price {}, cost {}, {}s",
            result.stores.len(),
            result.total_price,
            result.total_cost,
            result.duration
        );
        Ok(result)
    }
}
