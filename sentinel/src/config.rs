//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The file path
//! defaults to `config.yaml` and can be changed with `-f` or `SENTINEL_CONFIG`. A missing file is
//! not an error: every field has a default, so a function deployment can be configured purely
//! from its environment.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `SENTINEL_` override YAML values
//!
//! Nested values use double underscores, e.g. `SENTINEL_QUERY__DATABASE=billing` sets
//! `query.database`.
//!
//! ## Example
//!
//! ```yaml
//! port: 8080
//! query:
//!   database: db_cost_sentinel
//!   output_location: s3://athena-query-results/
//!   poll_interval: 500ms
//! aws:
//!   region: us-east-1
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::Error;
use crate::query::QueryRequest;

/// Default cost query: one row per product, region, operation, usage type and day.
pub const DEFAULT_QUERY: &str = r#"SELECT
    product_code,
    region,
    operation,
    usage_type,
    "sum_usage_amount_#0",
    unit,
    usage_start_date,
    "sum_unblended_cost_#0"
FROM "banco"."tabela"
ORDER BY usage_start_date ASC"#;

/// CLI args - config file location plus one-off modes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "SENTINEL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,

    /// Run the cost query once, print the JSON report to stdout and exit.
    #[arg(long, conflicts_with = "validate")]
    pub once: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
    /// The query that produces the report
    pub query: QueryConfig,
    /// AWS client overrides
    pub aws: AwsConfig,
}

/// The fixed query and how it is executed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// SQL text submitted on every request
    pub sql: String,
    /// Athena database (catalog schema) the query runs against
    pub database: String,
    /// S3 location Athena writes raw results to
    pub output_location: String,
    /// Athena workgroup; the account's primary workgroup when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workgroup: Option<String>,
    /// Delay between execution status checks
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

/// Overrides for the AWS SDK. Credentials always come from the default provider chain.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwsConfig {
    /// Region override; falls back to `AWS_REGION` and the profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom Athena endpoint (e.g. a local emulator)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<Url>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            enable_otel_export: false,
            query: QueryConfig::default(),
            aws: AwsConfig::default(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            sql: DEFAULT_QUERY.to_string(),
            database: "db_cost_sentinel".to_string(),
            output_location: "s3://athena-query-results-v1-danilo/".to_string(),
            workgroup: None,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl QueryConfig {
    pub fn to_request(&self) -> QueryRequest {
        QueryRequest {
            sql: self.sql.clone(),
            database: self.database.clone(),
            output_location: self.output_location.clone(),
            workgroup: self.workgroup.clone(),
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // SENTINEL_CONFIG names the file itself
            .merge(Env::prefixed("SENTINEL_").ignore(&["CONFIG"]).split("__"))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |message: &str| Error::InvalidConfig {
            message: message.to_string(),
        };

        if self.query.sql.trim().is_empty() {
            return Err(invalid("query.sql must not be empty"));
        }
        if self.query.database.trim().is_empty() {
            return Err(invalid("query.database must not be empty"));
        }
        match Url::parse(&self.query.output_location) {
            Ok(url) if url.scheme() == "s3" && url.host_str().is_some_and(|h| !h.is_empty()) => {}
            _ => {
                return Err(Error::InvalidConfig {
                    message: format!("query.output_location must be an s3:// URL, got '{}'", self.query.output_location),
                });
            }
        }
        if self.query.poll_interval.is_zero() {
            return Err(invalid("query.poll_interval must be greater than zero"));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(config: &str) -> Args {
        Args {
            config: config.to_string(),
            validate: false,
            once: false,
        }
    }

    #[test]
    fn test_defaults_without_config_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.bind_address(), "0.0.0.0:3001");
            assert_eq!(config.query.database, "db_cost_sentinel");
            assert_eq!(config.query.poll_interval, Duration::from_secs(1));
            assert!(config.query.sql.contains("ORDER BY usage_start_date ASC"));
            assert!(config.aws.region.is_none());

            Ok(())
        });
    }

    #[test]
    fn test_yaml_and_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 8080
query:
  database: billing
  output_location: s3://my-results/prefix/
  workgroup: reports
  poll_interval: 250ms
aws:
  region: eu-west-1
  endpoint_url: http://localhost:4566
"#,
            )?;

            jail.set_env("SENTINEL_HOST", "127.0.0.1");
            jail.set_env("SENTINEL_QUERY__DATABASE", "billing_v2");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.bind_address(), "127.0.0.1:8080");
            assert_eq!(config.query.database, "billing_v2");
            assert_eq!(config.query.workgroup.as_deref(), Some("reports"));
            assert_eq!(config.query.poll_interval, Duration::from_millis(250));
            assert_eq!(config.aws.region.as_deref(), Some("eu-west-1"));
            assert_eq!(config.aws.endpoint_url.as_ref().map(Url::as_str), Some("http://localhost:4566/"));

            let request = config.query.to_request();
            assert_eq!(request.output_location, "s3://my-results/prefix/");
            assert_eq!(request.database, "billing_v2");

            Ok(())
        });
    }

    #[test]
    fn test_rejects_non_s3_output_location() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "query:\n  output_location: /tmp/results\n")?;

            let err = Config::load(&args("test.yaml")).unwrap_err();
            assert!(err.to_string().contains("s3:// URL"), "unexpected error: {err}");

            Ok(())
        });
    }

    #[test]
    fn test_rejects_zero_poll_interval_and_unknown_fields() {
        Jail::expect_with(|jail| {
            jail.create_file("zero.yaml", "query:\n  poll_interval: 0s\n")?;
            assert!(Config::load(&args("zero.yaml")).is_err());

            jail.create_file("unknown.yaml", "query:\n  timeout: 30s\n")?;
            assert!(Config::load(&args("unknown.yaml")).is_err());

            Ok(())
        });
    }
}
