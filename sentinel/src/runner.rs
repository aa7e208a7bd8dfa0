//! Query lifecycle: submit, poll until terminal, fetch and shape the rows.
//!
//! A [`QueryRunner`] is shared by every request. It holds no mutable state; each call to
//! [`QueryRunner::run`] drives one independent execution:
//!
//! ```text
//! START -> SUBMITTED -> POLLING (every poll_interval) -> SUCCEEDED -> TRANSFORMING -> report
//!                                                     -> FAILED                   -> Error::QueryFailed
//! any service error                                                              -> Error::QueryService
//! ```
//!
//! Polling has no deadline and no attempt cap. A query that never leaves QUEUED/RUNNING
//! keeps the caller waiting until the hosting platform gives up, and aborting the caller
//! does not cancel the execution in Athena.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::errors::{Error, Result};
use crate::query::{DEFAULT_FAILURE_REASON, QueryExecution, QueryRequest, QueryService, QueryState};
use crate::report::CostReport;

#[derive(Clone)]
pub struct QueryRunner {
    service: Arc<dyn QueryService>,
    request: QueryRequest,
    poll_interval: Duration,
}

impl QueryRunner {
    pub fn new(service: Arc<dyn QueryService>, request: QueryRequest, poll_interval: Duration) -> Self {
        Self {
            service,
            request,
            poll_interval,
        }
    }

    /// Submit the configured query and return the execution id.
    #[instrument(skip(self), fields(database = %self.request.database))]
    pub async fn submit(&self) -> Result<String> {
        let execution_id = self.service.submit(&self.request).await?;
        info!(execution_id = %execution_id, "Submitted cost query");
        Ok(execution_id)
    }

    /// Poll until the execution is terminal.
    ///
    /// Returns the SUCCEEDED snapshot, or [`Error::QueryFailed`] carrying the service's reason
    /// (or [`DEFAULT_FAILURE_REASON`]) as soon as FAILED is observed.
    #[instrument(skip(self))]
    pub async fn await_completion(&self, execution_id: &str) -> Result<QueryExecution> {
        let started = tokio::time::Instant::now();
        let mut polls = 0u64;

        let execution = loop {
            let execution = self.service.get_status(execution_id).await?;
            polls += 1;

            if execution.state.is_terminal() {
                break execution;
            }
            debug!(state = ?execution.state, polls, "Query not finished yet");
            tokio::time::sleep(self.poll_interval).await;
        };

        if execution.state == QueryState::Failed {
            return Err(Error::QueryFailed {
                execution_id: execution.id,
                reason: execution.failure_reason.unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string()),
            });
        }

        info!(
            execution_id = %execution.id,
            polls,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query succeeded"
        );
        Ok(execution)
    }

    /// Fetch the rows of a finished execution and build the report.
    #[instrument(skip(self))]
    pub async fn fetch_and_transform(&self, execution_id: &str) -> Result<CostReport> {
        let rows = self.service.get_results(execution_id).await?;
        let report = CostReport::from_rows(&rows);

        // The first row is the header
        let dropped = rows.len().saturating_sub(1) - report.results.len();
        info!(
            rows = report.results.len(),
            dropped,
            total_monthly = report.total_monthly,
            "Built cost report"
        );
        Ok(report)
    }

    /// Run the whole lifecycle once.
    pub async fn run(&self) -> Result<CostReport> {
        let execution_id = self.submit().await?;
        self.await_completion(&execution_id).await?;
        self.fetch_and_transform(&execution_id).await
    }
}
