//! Test utilities shared by handler tests.

use std::sync::Arc;
use std::time::Duration;

use axum_test::{TestResponse, TestServer};

use crate::config::Config;
use crate::query::{MockQueryService, Row};

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.query.poll_interval = Duration::from_millis(1);
    config
}

pub fn create_test_app(mock: &MockQueryService) -> TestServer {
    crate::Application::with_service(create_test_config(), Arc::new(mock.clone())).into_test_server()
}

/// Test server over the router the Lambda runtime drives.
pub fn create_function_test_app(mock: &MockQueryService) -> TestServer {
    crate::Application::with_service(create_test_config(), Arc::new(mock.clone())).into_function_test_server()
}

pub fn assert_cors_headers(response: &TestResponse) {
    assert_eq!(response.header("access-control-allow-origin"), "*");
    assert_eq!(response.header("access-control-allow-methods"), "OPTIONS,GET");
    assert_eq!(response.header("access-control-allow-headers"), "Content-Type");
}

pub fn header_row() -> Row {
    [
        "product_code",
        "region",
        "operation",
        "usage_type",
        "sum_usage_amount_#0",
        "unit",
        "usage_start_date",
        "sum_unblended_cost_#0",
    ]
    .iter()
    .map(|name| Some(name.to_string()))
    .collect()
}

/// An EC2-style line item; `amount` of `None` leaves the cell empty.
pub fn cost_row(service: &str, region: &str, amount: Option<&str>, date: &str, cost: &str) -> Row {
    vec![
        Some(service.to_string()),
        Some(region.to_string()),
        Some("RunInstances".to_string()),
        Some("BoxUsage".to_string()),
        amount.map(str::to_string),
        Some("Hrs".to_string()),
        Some(date.to_string()),
        Some(cost.to_string()),
    ]
}
