// Product models: what the customer asks for and what brands charge for it

use crate::models::Price;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single line of the shopping list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequirement {
    /// Catalog category the product is listed under
    pub category: String,

    /// Product name as listed in the catalog
    pub name: String,

    /// Link to the product page
    #[serde(default)]
    pub url: String,

    /// Whether the product is sold by weight
    #[serde(default)]
    pub is_weighed: bool,

    /// Quantity multiplier applied to the unit price
    pub amount: i64,
}

impl ProductRequirement {
    /// Creates a requirement for `amount` units of a product
    pub fn new<C: Into<String>, N: Into<String>>(category: C, name: N, amount: i64) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            url: String::new(),
            is_weighed: false,
            amount,
        }
    }

    /// Identity of the product within the catalog
    pub fn key(&self) -> (&str, &str) {
        (&self.category, &self.name)
    }
}

/// Regular and discount-card prices of a product at one brand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandPrice {
    pub brand: String,
    pub price_regular: Price,
    pub price_discount: Price,
}

impl BrandPrice {
    pub fn new<S: Into<String>>(brand: S, price_regular: Price, price_discount: Price) -> Self {
        Self {
            brand: brand.into(),
            price_regular,
            price_discount,
        }
    }

    /// Resolves the price the customer pays, using the discount price when
    /// they hold the brand's card
    pub fn quote(&self, discount_brands: &HashSet<String>) -> PriceQuote {
        let price = if discount_brands.contains(&self.brand) {
            self.price_discount
        } else {
            self.price_regular
        };
        PriceQuote {
            price,
            store_brand: self.brand.clone(),
        }
    }
}

/// Catalog answer for one product: every brand price found for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuotes {
    pub category: String,
    pub name: String,
    pub prices: Vec<BrandPrice>,
}

/// Price of a product at a brand after the discount substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    /// Price in minor currency units
    pub price: Price,
    pub store_brand: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_key() {
        let req = ProductRequirement::new("dairy", "milk", 2);
        assert_eq!(req.key(), ("dairy", "milk"));
        assert_eq!(req.amount, 2);
    }

    #[test]
    fn test_quote_uses_discount_only_with_card() {
        let price = BrandPrice::new("magnit", 120, 99);
        let mut cards = HashSet::new();

        assert_eq!(price.quote(&cards).price, 120);

        cards.insert("magnit".to_string());
        let quote = price.quote(&cards);
        assert_eq!(quote.price, 99);
        assert_eq!(quote.store_brand, "magnit");
    }

    #[test]
    fn test_requirement_json_shape() {
        let json = r#"{"category":"dairy","name":"milk","isWeighed":true,"amount":3}"#;
        let req: ProductRequirement = serde_json::from_str(json).unwrap();

        assert!(req.is_weighed);
        assert_eq!(req.url, "");
        assert_eq!(req.amount, 3);
    }
}
