//! Per-view cancellation. A view owns a [`ViewScope`]; dropping the scope
//! cancels every request still running on its behalf.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Race `fut` against cancellation. A result that arrives after the
    /// token was cancelled is discarded.
    pub async fn run<T, F>(&self, fut: F) -> ApiResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        if self.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ApiError::Cancelled),
            result = fut => {
                if self.is_cancelled() {
                    Err(ApiError::Cancelled)
                } else {
                    result
                }
            }
        }
    }
}

/// Lifetime of one view. Cancels its token when dropped.
#[derive(Debug, Default)]
pub struct ViewScope {
    token: CancelToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_passes_results_through() {
        let scope = ViewScope::new();
        let value = scope.token().run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_dropping_scope_cancels_pending_call() {
        let scope = ViewScope::new();
        let token = scope.token();

        let pending = tokio::spawn(async move {
            token
                .run(async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(())
                })
                .await
        });

        tokio::task::yield_now().await;
        drop(scope);

        let result = tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(ApiError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let token = CancelToken::new();
        token.cancel();
        let result: ApiResult<()> = token
            .run(async { Err(ApiError::Api("must not run".to_string())) })
            .await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
