//! Calculator construction against mocked collaborators
//!
//! Verifies that price data is fetched once at construction and that collaborator
//! failures surface unchanged.

mod common;

use async_trait::async_trait;
use common::*;
use mockall::mock;
use rust_decimal_macros::dec;
use serverless_cost::fetcher::{
    PriceTableFetcher, RawPriceTable, SpotPriceFetcher, SpotPriceSnapshot,
};
use serverless_cost::region::{Region, RegionDirectory};
use serverless_cost::{
    ContainerBilling, ContainerUsage, FargatePriceCalculator, FunctionUsage,
    LambdaPriceCalculator, OsType, PricingError, Result,
};

mock! {
    pub Regions {}

    #[async_trait]
    impl RegionDirectory for Regions {
        async fn resolve(&self, region_code: &str) -> Result<String>;
        async fn list_regions(&self) -> Result<Vec<Region>>;
    }
}

mock! {
    pub PriceLists {}

    #[async_trait]
    impl PriceTableFetcher for PriceLists {
        async fn fetch(&self, service_name: &str) -> Result<RawPriceTable>;
    }
}

mock! {
    pub SpotPrices {}

    #[async_trait]
    impl SpotPriceFetcher for SpotPrices {
        async fn fetch(&self) -> Result<SpotPriceSnapshot>;
    }
}

fn resolving_regions() -> MockRegions {
    let mut regions = MockRegions::new();
    regions
        .expect_resolve()
        .withf(|code| code == REGION_CODE)
        .times(1)
        .returning(|_| Ok(REGION_NAME.to_string()));
    regions
}

fn container_task() -> ContainerUsage {
    ContainerUsage {
        os_type: OsType::LinuxX86,
        vcpu: dec!(1),
        memory_gb: dec!(2),
        storage_gb: dec!(20),
        duration_seconds: dec!(3600),
        free_tier: false,
    }
}

#[tokio::test]
async fn test_fargate_fetches_each_source_once() {
    let regions = resolving_regions();
    let mut prices = MockPriceLists::new();
    prices
        .expect_fetch()
        .withf(|service| service == "ecs")
        .times(1)
        .returning(|_| Ok(ecs_table()));
    let mut spot = MockSpotPrices::new();
    spot.expect_fetch().times(1).returning(|| Ok(spot_snapshot()));

    let calculator = FargatePriceCalculator::new(REGION_CODE, &regions, &prices, &spot)
        .await
        .unwrap();

    // Repeated calculations reuse the fetched data
    for _ in 0..3 {
        calculator
            .calculate_cost(&container_task(), ContainerBilling::OnDemand)
            .unwrap();
        calculator
            .calculate_cost(&container_task(), ContainerBilling::Spot)
            .unwrap();
    }
    calculator.calculate_savings(&container_task()).unwrap();
}

#[tokio::test]
async fn test_fargate_spot_fetch_failure_is_fatal() {
    let regions = resolving_regions();
    let mut prices = MockPriceLists::new();
    prices.expect_fetch().returning(|_| Ok(ecs_table()));
    let mut spot = MockSpotPrices::new();
    spot.expect_fetch().times(1).returning(|| {
        Err(PricingError::Upstream {
            source_name: "spot-prices".to_string(),
            message: "connection refused".to_string(),
            source: None,
        })
    });

    let err = match FargatePriceCalculator::new(REGION_CODE, &regions, &prices, &spot).await {
        Ok(_) => panic!("expected spot fetch failure"),
        Err(err) => err,
    };
    assert!(err.is_upstream_error());
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_region_failure_skips_price_fetch() {
    let mut regions = MockRegions::new();
    regions
        .expect_resolve()
        .returning(|code| Err(PricingError::UnknownRegion(code.to_string())));
    let mut prices = MockPriceLists::new();
    prices.expect_fetch().never();

    let result = LambdaPriceCalculator::new("xx-nowhere-1", &regions, &prices).await;
    assert!(matches!(
        result,
        Err(PricingError::UnknownRegion(ref code)) if code == "xx-nowhere-1"
    ));
}

#[tokio::test]
async fn test_lambda_fetches_lambda_price_list_once() {
    let regions = resolving_regions();
    let mut prices = MockPriceLists::new();
    prices
        .expect_fetch()
        .withf(|service| service == "lambda")
        .times(1)
        .returning(|_| Ok(lambda_table()));

    let calculator = LambdaPriceCalculator::new(REGION_CODE, &regions, &prices)
        .await
        .unwrap();

    let usage = FunctionUsage {
        os_type: OsType::LinuxArm,
        memory_gb: dec!(1),
        duration_seconds: dec!(0.1),
        requests: 1_000_000,
        free_tier: false,
    };
    assert_eq!(
        calculator.calculate_simple_cost(&usage).unwrap().total_cost,
        dec!(1.53334)
    );
    assert!(calculator
        .calculate_edge_cost(dec!(1), dec!(0.1), 1_000_000)
        .is_ok());
}

#[tokio::test]
async fn test_lambda_incomplete_price_list_is_upstream_error() {
    let regions = resolving_regions();
    let mut prices = MockPriceLists::new();
    prices.expect_fetch().times(1).returning(|_| {
        let mut table = lambda_table();
        if let Some(items) = table.regions.get_mut(REGION_NAME) {
            items.remove("Lambda Edge-Duration");
        }
        Ok(table)
    });

    let err = match LambdaPriceCalculator::new(REGION_CODE, &regions, &prices).await {
        Ok(_) => panic!("expected missing price item"),
        Err(err) => err,
    };
    assert!(matches!(
        err,
        PricingError::MissingPriceItem { ref item, .. } if item == "Lambda Edge-Duration"
    ));
}
