//! AWS Athena implementation of [`QueryService`].

use async_trait::async_trait;
use aws_sdk_athena::{
    Client,
    config::Region,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration},
};
use tracing::{debug, instrument};

use super::{QueryExecution, QueryRequest, QueryService, QueryState, Row};
use crate::config::AwsConfig;
use crate::errors::{Error, Result};

/// Reason reported for executions cancelled without an explanation.
pub const CANCELLED_REASON: &str = "Query was cancelled";

/// Athena-backed query service.
///
/// Cloning is cheap; the SDK client is reference counted internally.
#[derive(Clone, Debug)]
pub struct AthenaQueryService {
    client: Client,
}

impl AthenaQueryService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS credential chain, applying region and endpoint overrides.
    pub async fn from_config(config: &AwsConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_athena::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint.as_str().trim_end_matches('/'));
        }

        Self::new(Client::from_conf(builder.build()))
    }
}

/// Flatten an SDK error into the `Code: message` form the service reports.
fn service_error<E, R>(operation: &str, err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    debug!(error = %DisplayErrorContext(&err), "Athena call failed: {}", operation);
    let message = match (err.code(), err.message()) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(code), None) => code.to_string(),
        _ => DisplayErrorContext(&err).to_string(),
    };
    Error::query_service(operation, message)
}

#[async_trait]
impl QueryService for AthenaQueryService {
    #[instrument(skip_all, fields(database = %request.database))]
    async fn submit(&self, request: &QueryRequest) -> Result<String> {
        let output = self
            .client
            .start_query_execution()
            .query_string(&request.sql)
            .query_execution_context(QueryExecutionContext::builder().database(&request.database).build())
            .result_configuration(ResultConfiguration::builder().output_location(&request.output_location).build())
            .set_work_group(request.workgroup.clone())
            .send()
            .await
            .map_err(|e| service_error("start query execution", e))?;

        output
            .query_execution_id()
            .map(str::to_string)
            .ok_or_else(|| Error::MalformedResponse {
                field: "QueryExecutionId".to_string(),
            })
    }

    #[instrument(skip(self))]
    async fn get_status(&self, execution_id: &str) -> Result<QueryExecution> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(|e| service_error("get query execution", e))?;

        let status = output
            .query_execution()
            .and_then(|execution| execution.status())
            .ok_or_else(|| Error::MalformedResponse {
                field: "QueryExecution.Status".to_string(),
            })?;
        let reason = status.state_change_reason().map(str::to_string);

        let execution = match status.state() {
            Some(QueryExecutionState::Queued) => QueryExecution::new(execution_id, QueryState::Queued),
            Some(QueryExecutionState::Running) => QueryExecution::new(execution_id, QueryState::Running),
            Some(QueryExecutionState::Succeeded) => QueryExecution::new(execution_id, QueryState::Succeeded),
            Some(QueryExecutionState::Failed) => QueryExecution::failed(execution_id, reason),
            Some(QueryExecutionState::Cancelled) => {
                QueryExecution::failed(execution_id, Some(reason.unwrap_or_else(|| CANCELLED_REASON.to_string())))
            }
            Some(other) => {
                return Err(Error::MalformedResponse {
                    field: format!("a known execution state (got {})", other.as_str()),
                });
            }
            None => {
                return Err(Error::MalformedResponse {
                    field: "QueryExecution.Status.State".to_string(),
                });
            }
        };

        Ok(execution)
    }

    #[instrument(skip(self))]
    async fn get_results(&self, execution_id: &str) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let output = self
                .client
                .get_query_results()
                .query_execution_id(execution_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| service_error("get query results", e))?;
            pages += 1;

            if let Some(result_set) = output.result_set() {
                rows.extend(
                    result_set
                        .rows()
                        .iter()
                        .map(|row| row.data().iter().map(|datum| datum.var_char_value().map(str::to_string)).collect::<Row>()),
                );
            }

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(pages, rows = rows.len(), "Fetched query results");
        Ok(rows)
    }
}
