// Request context
// Carries request/client identifiers for log correlation and a cancellation
// token that aborts in-flight cache and pool-state I/O
//
// Numan Thabit 2025 Nov

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::errors::RouteError;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: String,
    pub client_id: String,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            client_id: client_id.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `fut` until it completes or the request is cancelled.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, RouteError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RouteError::Cancelled),
            out = fut => Ok(out),
        }
    }
}
