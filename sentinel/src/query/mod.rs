//! Query service abstraction.
//!
//! The [`QueryService`] trait is the only seam between the cost report and the managed
//! query engine. Production uses [`athena::AthenaQueryService`]; tests script a
//! `MockQueryService`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub mod athena;
#[cfg(test)]
pub mod mock;

pub use athena::AthenaQueryService;
#[cfg(test)]
pub use mock::MockQueryService;

/// Reason reported when the service marks an execution FAILED without saying why.
pub const DEFAULT_FAILURE_REASON: &str = "Athena Error";

/// One row of a result set; `None` means the cell carried no value.
pub type Row = Vec<Option<String>>;

/// The fixed query submitted on every invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    pub database: String,
    /// Staging location the service writes raw results to (an `s3://` URL)
    pub output_location: String,
    pub workgroup: Option<String>,
}

/// Lifecycle state of an execution as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl QueryState {
    /// SUCCEEDED and FAILED end polling.
    pub fn is_terminal(self) -> bool {
        matches!(self, QueryState::Succeeded | QueryState::Failed)
    }
}

/// Snapshot of an execution observed through [`QueryService::get_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExecution {
    pub id: String,
    pub state: QueryState,
    pub failure_reason: Option<String>,
}

impl QueryExecution {
    pub fn new(id: impl Into<String>, state: QueryState) -> Self {
        Self {
            id: id.into(),
            state,
            failure_reason: None,
        }
    }

    pub fn failed(id: impl Into<String>, reason: Option<String>) -> Self {
        Self {
            id: id.into(),
            state: QueryState::Failed,
            failure_reason: reason,
        }
    }
}

/// Managed query engine operations used by the cost report.
///
/// Implementations only translate calls; polling and row shaping live in
/// [`crate::runner::QueryRunner`].
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Start an execution and return its opaque identifier.
    async fn submit(&self, request: &QueryRequest) -> Result<String>;

    /// Fetch the current state of an execution.
    async fn get_status(&self, execution_id: &str) -> Result<QueryExecution>;

    /// Fetch every result row of a finished execution, header row included.
    async fn get_results(&self, execution_id: &str) -> Result<Vec<Row>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!QueryState::Queued.is_terminal());
        assert!(!QueryState::Running.is_terminal());
        assert!(QueryState::Succeeded.is_terminal());
        assert!(QueryState::Failed.is_terminal());
    }
}
