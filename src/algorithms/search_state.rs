// Search states shared by the store selectors

use log::warn;
use petgraph::graph::NodeIndex;

use crate::error::OptimizeError;
use crate::models::{
    BrandId, CandidateLocation, CandidateSet, Cost, Price, PriceQuote, ProductRequirement, Time,
    combined_cost,
};
use crate::utils::duration_graph::DurationGraph;

/// Most brands a single search can tell apart
pub const MAX_BRANDS: usize = 64;

/// Set of visited brands over the dense brand enumeration of a [`CandidateSet`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BrandSet(u64);

impl BrandSet {
    pub fn contains(self, brand: BrandId) -> bool {
        self.0 & (1 << brand) != 0
    }

    /// Copy of the set with `brand` added
    pub fn with(self, brand: BrandId) -> Self {
        BrandSet(self.0 | (1 << brand))
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Best known price of one requirement and the brand offering it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSlot {
    /// Unit price
    pub price: Price,
    pub brand: BrandId,
}

/// Index of a state in a [`StateArena`]
pub type StateId = usize;

/// A partial shopping trip ending at `node`.
///
/// States are never modified once stored; a better trip to the same node is
/// a new state.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub node: NodeIndex,
    /// One slot per requirement, filled once some visited brand sells it
    pub slots: Vec<Option<ProductSlot>>,
    /// Travel time from the user to `node`
    pub duration: Time,
    /// Sum of `price * amount` over filled slots
    pub total_price: Price,
    pub visited: BrandSet,
    pub predecessor: Option<StateId>,
}

impl SearchState {
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// True when every requirement has a price
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Price plus duration valued at `exchange_rate`, for full states only
    pub fn combined_cost(&self, exchange_rate: i64) -> Option<Cost> {
        if self.is_full() {
            Some(combined_cost(self.total_price, self.duration, exchange_rate))
        } else {
            None
        }
    }
}

/// Owns every state created during one search; predecessors are indices.
#[derive(Debug, Default)]
pub struct StateArena {
    states: Vec<SearchState>,
}

impl StateArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, state: SearchState) -> StateId {
        self.states.push(state);
        self.states.len() - 1
    }

    pub fn get(&self, id: StateId) -> &SearchState {
        &self.states[id]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// States from the initial one up to `id`
    pub fn chain(&self, id: StateId) -> Vec<StateId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(prev) = self.states[current].predecessor {
            chain.push(prev);
            current = prev;
        }
        chain.reverse();
        chain
    }
}

/// Minimum unit price of every requirement at every candidate brand
#[derive(Debug, Clone)]
pub struct PriceTable {
    /// `prices[requirement][brand]`
    prices: Vec<Vec<Option<Price>>>,
    amounts: Vec<i64>,
}

impl PriceTable {
    /// Builds the table from the quotes of each requirement, in requirement
    /// order. Quotes of brands outside `candidates` are ignored and repeated
    /// quotes keep the minimum.
    pub fn new(
        requirements: &[ProductRequirement],
        quotes: &[Vec<PriceQuote>],
        candidates: &CandidateSet,
    ) -> Self {
        let brand_count = candidates.brands().len();
        let prices = requirements
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let mut row = vec![None; brand_count];
                for quote in quotes.get(i).map(Vec::as_slice).unwrap_or_default() {
                    let Some(brand) = candidates.brand_id(&quote.store_brand) else {
                        continue;
                    };
                    let slot: &mut Option<Price> = &mut row[brand];
                    if slot.map_or(true, |current| quote.price < current) {
                        *slot = Some(quote.price);
                    }
                }
                row
            })
            .collect();

        Self {
            prices,
            amounts: requirements.iter().map(|req| req.amount).collect(),
        }
    }

    pub fn price(&self, requirement: usize, brand: BrandId) -> Option<Price> {
        self.prices[requirement].get(brand).copied().flatten()
    }

    pub fn amount(&self, requirement: usize) -> i64 {
        self.amounts[requirement]
    }

    /// Number of requirements
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Requirements no candidate brand sells
    pub fn uncovered(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.prices[i].iter().all(Option::is_none))
            .collect()
    }
}

/// The chosen stores and purchases of a selector
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Stores in the order the search visited them
    pub stores: Vec<CandidateLocation>,
    /// Price and brand per requirement
    pub purchases: Vec<ProductSlot>,
    /// Round trip duration of the search path
    pub duration: Time,
    pub total_price: Price,
}

/// Everything a selector reads during one search
pub struct SearchContext<'a> {
    pub graph: &'a DurationGraph,
    pub candidates: &'a CandidateSet,
    pub prices: &'a PriceTable,
    pub exchange_rate: i64,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        graph: &'a DurationGraph,
        candidates: &'a CandidateSet,
        prices: &'a PriceTable,
        exchange_rate: i64,
    ) -> Result<Self, OptimizeError> {
        if candidates.brands().len() > MAX_BRANDS {
            return Err(OptimizeError::InvalidInput(format!(
                "{} store brands nearby, at most {MAX_BRANDS} are supported",
                candidates.brands().len()
            )));
        }
        Ok(Self {
            graph,
            candidates,
            prices,
            exchange_rate,
        })
    }

    /// Empty-handed state at the user's position
    pub fn initial_state(&self) -> SearchState {
        SearchState {
            node: self.graph.user(),
            slots: vec![None; self.prices.len()],
            duration: 0,
            total_price: 0,
            visited: BrandSet::default(),
            predecessor: None,
        }
    }

    pub fn location(&self, node: NodeIndex) -> Option<&'a CandidateLocation> {
        self.candidates.location(self.graph.id(node))
    }

    /// State reached by walking from `from` (stored as `from_id`) to `to`.
    ///
    /// Returns None when `to` is no known location or its brand was already
    /// visited on the way.
    pub fn expand(
        &self,
        from: &SearchState,
        from_id: StateId,
        to: NodeIndex,
        duration: Time,
    ) -> Option<SearchState> {
        let Some(location) = self.location(to) else {
            warn!("No such shop with id={}", self.graph.id(to));
            return None;
        };
        let brand = location.brand;
        if from.visited.contains(brand) {
            return None;
        }

        let mut slots = from.slots.clone();
        for (i, slot) in slots.iter_mut().enumerate() {
            if let Some(price) = self.prices.price(i, brand) {
                if slot.map_or(true, |current| price < current.price) {
                    *slot = Some(ProductSlot { price, brand });
                }
            }
        }
        let total_price = slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|slot| slot.price * self.prices.amount(i)))
            .sum();

        Some(SearchState {
            node: to,
            slots,
            duration: from.duration + duration,
            total_price,
            visited: from.visited.with(brand),
            predecessor: Some(from_id),
        })
    }

    /// Duration from the state's node back to the user, if known
    pub fn return_duration(&self, state: &SearchState) -> Option<Time> {
        self.graph.duration(state.node, self.graph.user())
    }

    /// Turns a full state into a selection. Stores on the path whose brand
    /// ended up selling nothing are left out.
    pub fn selection(
        &self,
        arena: &StateArena,
        id: StateId,
        return_duration: Time,
    ) -> Result<Selection, OptimizeError> {
        let state = arena.get(id);
        let purchases = state
            .slots
            .iter()
            .copied()
            .collect::<Option<Vec<ProductSlot>>>()
            .ok_or_else(|| OptimizeError::Internal("selected state is not fully priced".into()))?;

        let stores = arena
            .chain(id)
            .into_iter()
            .filter_map(|step| self.location(arena.get(step).node))
            .filter(|location| purchases.iter().any(|slot| slot.brand == location.brand))
            .cloned()
            .collect();

        Ok(Selection {
            stores,
            purchases,
            duration: state.duration + return_duration,
            total_price: state.total_price,
        })
    }
}
