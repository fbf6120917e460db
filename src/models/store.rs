// Store models: nearby shop groups and the candidate locations drawn from them

use crate::models::{BrandId, Location, LocationId, USER_NODE_ID};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One physical address returned by the nearby-shops lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: LocationId,
    pub point: Location,
    pub name: String,
}

impl Place {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, point: Location, name: N) -> Self {
        Self {
            id: id.into(),
            point,
            name: name.into(),
        }
    }
}

/// All nearby addresses of one store brand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopGroup {
    pub brand: String,
    pub places: Vec<Place>,
}

impl ShopGroup {
    pub fn new<S: Into<String>>(brand: S, places: Vec<Place>) -> Self {
        Self {
            brand: brand.into(),
            places,
        }
    }

    /// Points of every address in the group, in group order
    pub fn points(&self) -> Vec<Location> {
        self.places.iter().map(|place| place.point).collect()
    }
}

/// A location the shopper may visit
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateLocation {
    pub id: LocationId,
    pub point: Location,
    pub store_brand: String,
    pub display_name: String,

    /// Dense index of `store_brand` within the owning [`CandidateSet`]
    pub brand: BrandId,
}

/// Candidate locations of one optimization call with a dense brand enumeration
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    groups: Vec<ShopGroup>,
    locations: HashMap<LocationId, CandidateLocation>,
    brands: Vec<String>,
}

impl CandidateSet {
    /// Builds the candidate set from nearby-shop groups, keeping only brands
    /// accepted by `is_relevant`.
    ///
    /// Location ids must be globally unique: a repeated id keeps its first
    /// occurrence. Groups sharing a brand are merged and empty groups dropped.
    pub fn from_groups<F>(groups: Vec<ShopGroup>, is_relevant: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let mut set = CandidateSet::default();
        let mut group_of_brand: HashMap<String, usize> = HashMap::new();

        for group in groups {
            if !is_relevant(&group.brand) {
                continue;
            }

            for place in group.places {
                if place.id == USER_NODE_ID {
                    warn!("Dropping shop whose id collides with the user node: {}", place.id);
                    continue;
                }
                if set.locations.contains_key(&place.id) {
                    warn!("Duplicating shop with id={}", place.id);
                    continue;
                }

                let slot = *group_of_brand.entry(group.brand.clone()).or_insert_with(|| {
                    set.groups.push(ShopGroup::new(group.brand.clone(), Vec::new()));
                    set.brands.push(group.brand.clone());
                    set.groups.len() - 1
                });

                set.locations.insert(
                    place.id.clone(),
                    CandidateLocation {
                        id: place.id.clone(),
                        point: place.point,
                        store_brand: group.brand.clone(),
                        display_name: place.name.clone(),
                        brand: slot,
                    },
                );
                set.groups[slot].places.push(place);
            }
        }

        set
    }

    /// Groups in brand-index order
    pub fn groups(&self) -> &[ShopGroup] {
        &self.groups
    }

    /// Brand names indexed by [`BrandId`]
    pub fn brands(&self) -> &[String] {
        &self.brands
    }

    pub fn brand_id(&self, brand: &str) -> Option<BrandId> {
        self.brands.iter().position(|known| known == brand)
    }

    pub fn location(&self, id: &str) -> Option<&CandidateLocation> {
        self.locations.get(id)
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
