//! # sentinel: AWS cost report over Athena
//!
//! `sentinel` answers one question: what did this AWS account spend, line by line. Each request
//! submits a fixed query against the Cost and Usage Report table in Athena, waits for it to
//! finish, and returns the rows as JSON together with the rounded total.
//!
//! ## Request Flow
//!
//! A `GET /costs` (or `GET /`) goes through three steps in [`runner::QueryRunner`]:
//!
//! 1. **Submit** the configured SQL with its database and S3 staging location.
//! 2. **Poll** the execution every `query.poll_interval` until it is SUCCEEDED or FAILED.
//! 3. **Fetch and shape** the result rows: drop the header, map the eight columns to a
//!    [`report::CostRecord`], drop rows whose cost is not a number, and sum the rest.
//!
//! Any error along the way turns into a 500 with `{"error": "..."}`. Every response carries
//! permissive CORS headers so the dashboard can be hosted anywhere.
//!
//! ## Running
//!
//! The binary serves the router with `axum::serve`. Built with the `lambda` feature and started
//! by the Lambda runtime (`AWS_LAMBDA_RUNTIME_API` set), `lambda_http` drives
//! [`build_function_router`] instead, which answers any path with the report. `--once` prints a
//! single report and exits.
//!
//! ```no_run
//! use clap::Parser;
//! use sentinel::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = sentinel::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     sentinel::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod config;
pub mod errors;
pub mod openapi;
pub mod query;
pub mod report;
pub mod runner;
pub mod telemetry;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use axum::{Json, Router, middleware, routing::get};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

use api::handlers::costs;
use openapi::ApiDoc;
use query::{AthenaQueryService, QueryService};
use runner::QueryRunner;

/// Application state shared across all request handlers.
///
/// Nothing in here is mutated after startup, so concurrent requests never contend.
///
/// ```ignore
/// let state = AppState::builder().runner(runner).build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub runner: QueryRunner,
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/", get(costs::get_costs).options(costs::preflight))
        .route("/costs", get(costs::get_costs).options(costs::preflight))
        .route("/costs.csv", get(costs::export_csv).options(costs::preflight))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}

/// Build the router: report endpoints, health check, OpenAPI docs and request tracing.
///
/// Unknown paths get a JSON 404. Every response, 405s included, carries the CORS headers.
pub fn build_router(state: AppState) -> Router {
    finish_router(routes().fallback(costs::not_found), state)
}

/// Build the router driven by the Lambda runtime.
///
/// Same routes as [`build_router`], but any other path runs the report, so a REST API stage
/// prefix such as `/prod/costs` still reaches it.
pub fn build_function_router(state: AppState) -> Router {
    finish_router(routes().fallback(costs::any_path), state)
}

fn finish_router(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(middleware::map_response(api::with_access_control_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// The assembled service.
///
/// 1. **Create**: [`Application::new`] builds the Athena client from the default AWS chain
/// 2. **Serve**: [`Application::serve`] binds a TCP port, or [`Application::run_lambda`] hands
///    the function router to the Lambda runtime
pub struct Application {
    router: Router,
    app_state: AppState,
    config: Config,
}

impl Application {
    /// Create an application backed by Athena
    pub async fn new(config: Config) -> Self {
        debug!("Starting cost sentinel with configuration: {:#?}", config);
        let service = AthenaQueryService::from_config(&config.aws).await;
        Self::with_service(config, Arc::new(service))
    }

    /// Create an application backed by any query service
    pub fn with_service(config: Config, service: Arc<dyn QueryService>) -> Self {
        let runner = QueryRunner::new(service, config.query.to_request(), config.query.poll_interval);
        let app_state = AppState::builder().runner(runner).build();
        let router = build_router(app_state.clone());

        Self { router, app_state, config }
    }

    pub fn runner(&self) -> &QueryRunner {
        &self.app_state.runner
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Convert application into a test server over the function router (for tests)
    #[cfg(test)]
    pub fn into_function_test_server(self) -> axum_test::TestServer {
        let router = build_function_router(self.app_state);
        axum_test::TestServer::new(router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Cost sentinel listening on http://{}, report at http://localhost:{}/costs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }

    /// Hand the function router to the AWS Lambda runtime. Returns when the runtime stops polling.
    #[cfg(feature = "lambda")]
    pub async fn run_lambda(self) -> anyhow::Result<()> {
        info!(database = %self.config.query.database, "Running under the AWS Lambda runtime");
        let router = build_function_router(self.app_state);
        let result = lambda_http::run(router).await.map_err(|e| anyhow::anyhow!(e));
        telemetry::shutdown_telemetry();
        result
    }
}
