//! Scripted query service for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use super::{QueryExecution, QueryRequest, QueryService, Row};
use crate::errors::{Error, Result};

/// Record of a call made to the mock service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Submit(QueryRequest),
    GetStatus(String),
    GetResults(String),
}

#[derive(Default)]
struct Script {
    submissions: VecDeque<Result<String>>,
    statuses: VecDeque<Result<QueryExecution>>,
    results: VecDeque<Result<Vec<Row>>>,
}

/// Mock query service.
///
/// Responses are queued per operation and handed out in FIFO order. An operation with
/// nothing queued fails, so a test that polls more often than it scripted gets an error
/// instead of hanging.
///
/// # Example
/// ```ignore
/// let mock = MockQueryService::new();
/// mock.add_submission(Ok("exec-1".to_string()));
/// mock.add_status(Ok(QueryExecution::new("exec-1", QueryState::Running)));
/// mock.add_status(Ok(QueryExecution::new("exec-1", QueryState::Succeeded)));
/// mock.add_results(Ok(rows));
/// ```
#[derive(Clone, Default)]
pub struct MockQueryService {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockQueryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_submission(&self, response: Result<String>) {
        self.script.lock().submissions.push_back(response);
    }

    pub fn add_status(&self, response: Result<QueryExecution>) {
        self.script.lock().statuses.push_back(response);
    }

    pub fn add_results(&self, response: Result<Vec<Row>>) {
        self.script.lock().results.push_back(response);
    }

    /// Script a full successful run: submission, `running_polls` RUNNING statuses, SUCCEEDED, then `rows`.
    pub fn script_success(&self, execution_id: &str, running_polls: usize, rows: Vec<Row>) {
        use super::QueryState;

        self.add_submission(Ok(execution_id.to_string()));
        for _ in 0..running_polls {
            self.add_status(Ok(QueryExecution::new(execution_id, QueryState::Running)));
        }
        self.add_status(Ok(QueryExecution::new(execution_id, QueryState::Succeeded)));
        self.add_results(Ok(rows));
    }

    /// Get all calls that have been made to this mock.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn unscripted(operation: &str) -> Error {
        Error::Other(anyhow::anyhow!("No mock response configured for {}", operation))
    }
}

#[async_trait]
impl QueryService for MockQueryService {
    async fn submit(&self, request: &QueryRequest) -> Result<String> {
        self.calls.lock().push(MockCall::Submit(request.clone()));
        self.script
            .lock()
            .submissions
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted("submit")))
    }

    async fn get_status(&self, execution_id: &str) -> Result<QueryExecution> {
        self.calls.lock().push(MockCall::GetStatus(execution_id.to_string()));
        self.script
            .lock()
            .statuses
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted("get_status")))
    }

    async fn get_results(&self, execution_id: &str) -> Result<Vec<Row>> {
        self.calls.lock().push(MockCall::GetResults(execution_id.to_string()));
        self.script
            .lock()
            .results
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted("get_results")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryState;

    #[tokio::test]
    async fn test_mock_returns_statuses_in_order() {
        let mock = MockQueryService::new();
        mock.add_status(Ok(QueryExecution::new("a", QueryState::Queued)));
        mock.add_status(Ok(QueryExecution::new("a", QueryState::Succeeded)));

        assert_eq!(mock.get_status("a").await.unwrap().state, QueryState::Queued);
        assert_eq!(mock.get_status("a").await.unwrap().state, QueryState::Succeeded);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_without_script_errors() {
        let mock = MockQueryService::new();
        assert!(mock.get_results("a").await.is_err());
        assert_eq!(mock.get_calls(), vec![MockCall::GetResults("a".to_string())]);
    }
}
