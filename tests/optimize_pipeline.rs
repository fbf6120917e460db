// Integration tests: the whole optimization pipeline over in-memory collaborators
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use shopping_route::config::{OptimizerConfig, TransportMode};
use shopping_route::models::{
    BrandPrice, Location, Place, ProductQuotes, ProductRequirement, ShopGroup, Time,
};
use shopping_route::services::memory::{
    FixedRoute, Fixture, StaticDurations, StaticPrices, StaticShops,
};
use shopping_route::services::{DurationService, MatrixTspService, RouteRow};
use shopping_route::{
    CancellationToken, OptimizeError, OptimizeRequest, Optimizer, Strategy, UpstreamError,
};

const USER: Location = Location {
    lon: 82.92,
    lat: 55.03,
};

fn point(offset: f64) -> Location {
    Location::new(USER.lon + offset, USER.lat)
}

fn quotes(category: &str, name: &str, prices: &[(&str, i64)]) -> ProductQuotes {
    ProductQuotes {
        category: category.to_string(),
        name: name.to_string(),
        prices: prices
            .iter()
            .map(|(brand, price)| BrandPrice::new(*brand, *price, *price))
            .collect(),
    }
}

fn routes(pairs: &[(Location, Location, Time)]) -> Vec<FixedRoute> {
    pairs
        .iter()
        .map(|(from, to, secs)| FixedRoute {
            from: *from,
            to: *to,
            duration: Some(*secs),
        })
        .collect()
}

fn request(requirements: Vec<ProductRequirement>, exchange_rate: i64) -> OptimizeRequest {
    OptimizeRequest {
        requirements,
        discount_brands: Vec::new(),
        user_point: USER,
        radius: 5000,
        exchange_rate,
    }
}

fn optimizer(
    shops: Vec<ShopGroup>,
    durations: StaticDurations,
    prices: Vec<ProductQuotes>,
    config: OptimizerConfig,
) -> Optimizer {
    Fixture {
        request: request(Vec::new(), 0),
        shops: StaticShops::new(shops),
        durations,
        prices: StaticPrices::new(prices),
    }
    .optimizer(config)
    .unwrap()
}

/// Two single-address brands selling milk, with different trip lengths
fn two_shop_world(alpha_price: i64, beta_price: i64) -> Optimizer {
    let alpha = point(0.001);
    let beta = point(-0.001);
    optimizer(
        vec![
            ShopGroup::new("alpha", vec![Place::new("a", alpha, "Alpha")]),
            ShopGroup::new("beta", vec![Place::new("b", beta, "Beta")]),
        ],
        StaticDurations::new(
            None,
            routes(&[
                (USER, alpha, 60),
                (alpha, USER, 60),
                (USER, beta, 54),
                (beta, USER, 54),
            ]),
        ),
        vec![quotes(
            "dairy",
            "milk",
            &[("alpha", alpha_price), ("beta", beta_price)],
        )],
        OptimizerConfig::default(),
    )
}

#[rstest]
// Both cost 24100; a low exchange rate prefers the cheaper basket
#[case(1200, 2500, "alpha", 100, 120)]
// Both cost 48100; a high exchange rate prefers the shorter trip
#[case(2400, 4900, "beta", 4900, 108)]
fn equal_cost_tie_break_depends_on_exchange_rate(
    #[case] exchange_rate: i64,
    #[case] beta_price: i64,
    #[case] brand: &str,
    #[case] price: i64,
    #[case] duration: Time,
) {
    let optimizer = two_shop_world(100, beta_price);
    let request = request(
        vec![ProductRequirement::new("dairy", "milk", 1)],
        exchange_rate,
    );

    let result = optimizer
        .optimize(&request, Strategy::PriceOptimal, &CancellationToken::new())
        .unwrap();

    assert_eq!(result.stores.len(), 1);
    assert_eq!(result.stores[0].brand, brand);
    assert_eq!(result.total_price, price);
    assert_eq!(result.duration, duration);
    assert_eq!(
        result.total_cost,
        price + ((duration as f64 / 6.0) * exchange_rate as f64) as i64
    );
}

#[test]
fn nearest_coverage_ignores_price() {
    let optimizer = two_shop_world(100, 900);
    let request = request(vec![ProductRequirement::new("dairy", "milk", 1)], 1);

    let cheapest = optimizer
        .optimize(&request, Strategy::PriceOptimal, &CancellationToken::new())
        .unwrap();
    let nearest = optimizer
        .optimize(&request, Strategy::NearestCoverage, &CancellationToken::new())
        .unwrap();

    assert_eq!(cheapest.stores[0].brand, "alpha");
    assert_eq!(nearest.stores[0].brand, "beta");
    assert_eq!(nearest.duration, 108);
    assert_eq!(nearest.total_price, 900);
}

#[test]
fn totals_add_up_across_stores() {
    let dairy = point(0.002);
    let bakery = point(0.004);
    let optimizer = optimizer(
        vec![
            ShopGroup::new("dairyland", vec![Place::new("d", dairy, "Dairyland")]),
            ShopGroup::new("bakehouse", vec![Place::new("b", bakery, "Bakehouse")]),
        ],
        StaticDurations::at_speed(1.4),
        vec![
            quotes("dairy", "milk", &[("dairyland", 89), ("bakehouse", 120)]),
            quotes("dairy", "kefir", &[("dairyland", 75)]),
            quotes("bakery", "bread", &[("bakehouse", 45)]),
        ],
        OptimizerConfig::default(),
    );
    let request = request(
        vec![
            ProductRequirement::new("dairy", "milk", 3),
            ProductRequirement::new("bakery", "bread", 2),
            ProductRequirement::new("dairy", "kefir", 1),
        ],
        0,
    );

    let result = optimizer
        .optimize(&request, Strategy::PriceOptimal, &CancellationToken::new())
        .unwrap();

    assert_eq!(result.total_price, 89 * 3 + 45 * 2 + 75);
    assert_eq!(result.total_cost, result.total_price);
    assert_eq!(result.product_count(), 3);
    for visit in &result.stores {
        let subtotal: i64 = visit.products.iter().map(|p| p.price).sum();
        assert_eq!(visit.subtotal, subtotal);
    }
    let brands: HashSet<_> = result.stores.iter().map(|visit| &visit.brand).collect();
    assert_eq!(brands.len(), result.stores.len());
    let milk = result
        .stores
        .iter()
        .flat_map(|visit| &visit.products)
        .find(|p| p.product.name == "milk")
        .unwrap();
    assert_eq!(milk.price, 89 * 3);
}

#[test]
fn discount_card_changes_the_price() {
    let shop = point(0.001);
    let optimizer = optimizer(
        vec![ShopGroup::new("lenta", vec![Place::new("l", shop, "Lenta")])],
        StaticDurations::at_speed(1.4),
        vec![ProductQuotes {
            category: "dairy".to_string(),
            name: "milk".to_string(),
            prices: vec![BrandPrice::new("lenta", 100, 80)],
        }],
        OptimizerConfig::default(),
    );
    let mut request = request(vec![ProductRequirement::new("dairy", "milk", 2)], 0);

    let regular = optimizer
        .optimize(&request, Strategy::PriceOptimal, &CancellationToken::new())
        .unwrap();
    request.discount_brands = vec!["lenta".to_string()];
    let carded = optimizer
        .optimize(&request, Strategy::PriceOptimal, &CancellationToken::new())
        .unwrap();

    assert_eq!(regular.total_price, 200);
    assert_eq!(carded.total_price, 160);
}

#[rstest]
#[case(Strategy::PriceOptimal)]
#[case(Strategy::NearestCoverage)]
fn product_sold_nowhere_cannot_be_covered(#[case] strategy: Strategy) {
    let optimizer = two_shop_world(100, 200);
    let request = request(
        vec![
            ProductRequirement::new("dairy", "milk", 1),
            ProductRequirement::new("deli", "caviar", 1),
        ],
        10,
    );

    let err = optimizer
        .optimize(&request, strategy, &CancellationToken::new())
        .unwrap_err();
    assert_eq!(err, OptimizeError::CannotCoverProducts);
    assert!(err.is_infeasible());
}

#[test]
fn cancelled_call_returns_no_result() {
    let optimizer = two_shop_world(100, 200);
    let request = request(vec![ProductRequirement::new("dairy", "milk", 1)], 10);
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert_eq!(
        optimizer.optimize(&request, Strategy::PriceOptimal, &cancel),
        Err(OptimizeError::Cancelled)
    );
}

struct FailingDurations;

impl DurationService for FailingDurations {
    fn durations_between(
        &self,
        _sources: &[Location],
        _targets: &[Location],
        _mode: TransportMode,
        _timeout: Duration,
    ) -> Result<Vec<RouteRow>, UpstreamError> {
        Err(UpstreamError::Unavailable {
            service: "durations",
            message: "503 Service Unavailable".to_string(),
        })
    }
}

#[test]
fn upstream_failure_is_propagated() {
    let shops = StaticShops::new(vec![ShopGroup::new(
        "alpha",
        vec![Place::new("a", point(0.001), "Alpha")],
    )]);
    let prices = StaticPrices::new(vec![quotes("dairy", "milk", &[("alpha", 100)])]);
    let config = OptimizerConfig::default();
    let durations: Arc<dyn DurationService> = Arc::new(FailingDurations);
    let optimizer = Optimizer::new(
        Arc::new(shops),
        durations.clone(),
        Arc::new(prices),
        Arc::new(MatrixTspService::new(durations, config.clone())),
        config,
    )
    .unwrap();
    let request = request(vec![ProductRequirement::new("dairy", "milk", 1)], 10);

    let err = optimizer
        .optimize(&request, Strategy::PriceOptimal, &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(
        err,
        OptimizeError::Upstream(UpstreamError::Unavailable { .. })
    ));
    assert!(!err.is_infeasible());
}

/// Straight-line durations that remember the largest batch requested
struct CountingDurations {
    inner: StaticDurations,
    largest_batch: AtomicUsize,
}

impl DurationService for CountingDurations {
    fn durations_between(
        &self,
        sources: &[Location],
        targets: &[Location],
        mode: TransportMode,
        timeout: Duration,
    ) -> Result<Vec<RouteRow>, UpstreamError> {
        self.largest_batch
            .fetch_max(sources.len().max(targets.len()), Ordering::SeqCst);
        self.inner.durations_between(sources, targets, mode, timeout)
    }
}

#[test]
fn many_addresses_are_fetched_in_small_chunks() {
    // 12 addresses of one brand and 5 of another
    let north: Vec<Place> = (0..12)
        .map(|i| Place::new(format!("n{i}"), point(0.001 * (i + 1) as f64), "North"))
        .collect();
    let south: Vec<Place> = (0..5)
        .map(|i| Place::new(format!("s{i}"), point(-0.001 * (i + 1) as f64), "South"))
        .collect();
    let shops = StaticShops::new(vec![
        ShopGroup::new("north", north),
        ShopGroup::new("south", south),
    ]);
    let prices = StaticPrices::new(vec![
        quotes("dairy", "milk", &[("north", 50)]),
        quotes("bakery", "bread", &[("south", 30)]),
    ]);
    let config = OptimizerConfig {
        chunk_size: 4,
        max_concurrent_requests: 2,
        ..OptimizerConfig::default()
    };
    let durations = Arc::new(CountingDurations {
        inner: StaticDurations::at_speed(1.4),
        largest_batch: AtomicUsize::new(0),
    });
    let optimizer = Optimizer::new(
        Arc::new(shops),
        durations.clone(),
        Arc::new(prices),
        Arc::new(MatrixTspService::new(durations.clone(), config.clone())),
        config,
    )
    .unwrap();
    let request = request(
        vec![
            ProductRequirement::new("dairy", "milk", 1),
            ProductRequirement::new("bakery", "bread", 1),
        ],
        60,
    );

    let result = optimizer
        .optimize(&request, Strategy::PriceOptimal, &CancellationToken::new())
        .unwrap();

    assert_eq!(durations.largest_batch.load(Ordering::SeqCst), 4);
    assert_eq!(result.stores.len(), 2);
    // The closest address of each brand
    let names: HashSet<_> = result.stores.iter().map(|s| s.brand.as_str()).collect();
    assert_eq!(names, HashSet::from(["north", "south"]));
    assert_eq!(result.total_price, 80);
}

/// Straight-line durations that cancel `token` on the first request
struct CancelOnFirstRequest {
    inner: StaticDurations,
    token: CancellationToken,
    calls: AtomicUsize,
}

impl DurationService for CancelOnFirstRequest {
    fn durations_between(
        &self,
        sources: &[Location],
        targets: &[Location],
        mode: TransportMode,
        timeout: Duration,
    ) -> Result<Vec<RouteRow>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.token.cancel();
        self.inner.durations_between(sources, targets, mode, timeout)
    }
}

#[test]
fn cancel_during_route_ordering_stops_duration_requests() {
    let shops = StaticShops::new(
        ["alpha", "beta", "gamma"]
            .iter()
            .enumerate()
            .map(|(i, brand)| {
                let place = Place::new(*brand, point(0.001 * (i + 1) as f64), *brand);
                ShopGroup::new(*brand, vec![place])
            })
            .collect(),
    );
    let prices = StaticPrices::new(vec![
        quotes("dairy", "milk", &[("alpha", 90)]),
        quotes("bakery", "bread", &[("beta", 40)]),
        quotes("fruit", "apple", &[("gamma", 15)]),
    ]);
    let token = CancellationToken::new();
    let route_durations = Arc::new(CancelOnFirstRequest {
        inner: StaticDurations::at_speed(1.4),
        token: token.clone(),
        calls: AtomicUsize::new(0),
    });
    // One point pair per request: 16 requests for the user and 3 stores
    let route_config = OptimizerConfig {
        chunk_size: 1,
        max_concurrent_requests: 1,
        ..OptimizerConfig::default()
    };
    let optimizer = Optimizer::new(
        Arc::new(shops),
        Arc::new(StaticDurations::at_speed(1.4)),
        Arc::new(prices),
        Arc::new(MatrixTspService::new(route_durations.clone(), route_config)),
        OptimizerConfig::default(),
    )
    .unwrap();
    let request = request(
        vec![
            ProductRequirement::new("dairy", "milk", 1),
            ProductRequirement::new("bakery", "bread", 1),
            ProductRequirement::new("fruit", "apple", 1),
        ],
        10,
    );

    assert_eq!(
        optimizer.optimize(&request, Strategy::PriceOptimal, &token),
        Err(OptimizeError::Cancelled)
    );
    assert_eq!(route_durations.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn list_needing_more_stores_than_a_route_visits_is_invalid_input() {
    let brands = shopping_route::algorithms::finalizer::MAX_ROUTE_STORES + 2;
    let shops: Vec<ShopGroup> = (0..brands)
        .map(|i| {
            let place = Place::new(format!("s{i}"), point(0.0005 * (i + 1) as f64), "Shop");
            ShopGroup::new(format!("brand{i}"), vec![place])
        })
        .collect();
    let prices: Vec<ProductQuotes> = (0..brands)
        .map(|i| {
            let brand = format!("brand{i}");
            quotes("misc", &format!("item{i}"), &[(brand.as_str(), 10)])
        })
        .collect();
    let optimizer = optimizer(
        shops,
        StaticDurations::at_speed(1.4),
        prices,
        OptimizerConfig::default(),
    );
    let request = request(
        (0..brands)
            .map(|i| ProductRequirement::new("misc", format!("item{i}"), 1))
            .collect(),
        10,
    );

    let err = optimizer
        .optimize(&request, Strategy::PriceOptimal, &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, OptimizeError::InvalidInput(_)));
    assert!(!err.is_infeasible());
}
