// Models module - exports all model types

mod location;
mod product;
mod route;
mod store;

// Re-export model types
pub use self::location::Location;
pub use self::product::{BrandPrice, PriceQuote, ProductQuotes, ProductRequirement};
pub use self::route::{OptimizationResult, PurchasedProduct, StoreVisit};
pub use self::store::{CandidateLocation, CandidateSet, Place, ShopGroup};

// Common type aliases for improved code readability
pub type LocationId = String;
pub type BrandId = usize;
/// Money in minor currency units
pub type Price = i64;
/// Price plus time valued at the exchange rate
pub type Cost = i64;
/// Travel duration in seconds
pub type Time = i64;

/// Reserved node id of the user's position in the duration graph
pub const USER_NODE_ID: &str = "user";

/// Combined objective: price plus duration valued at `exchange_rate` per
/// six seconds, truncated toward zero.
pub fn combined_cost(price: Price, duration: Time, exchange_rate: i64) -> Cost {
    price + ((duration as f64 / 6.0) * exchange_rate as f64) as i64
}
