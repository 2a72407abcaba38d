//! Caller-owned timeouts on top of cooperative cancellation.

use crate::error::{ApplicationError, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Timeout used for interactive calls
pub const INTERACTIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs `op` with a child of `cancel` that fires after `timeout`.
///
/// On expiry the child token is canceled and `op` is driven to completion so
/// it can release what it holds (logout still clears cookies, a stream close
/// still runs), then [`ApplicationError::OperationTimedOut`] is returned.
/// Cancellation of `cancel` itself is reported by `op` as usual.
///
/// # Errors
///
/// Returns whatever `op` returns, or `OperationTimedOut`.
pub async fn with_deadline<T, F, Fut>(
    timeout: Duration,
    cancel: &CancellationToken,
    op: F,
) -> Result<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let token = cancel.child_token();
    let fut = op(token.clone());
    tokio::pin!(fut);

    tokio::select! {
        result = &mut fut => result,
        () = tokio::time::sleep(timeout) => {
            token.cancel();
            let _ = fut.await;
            Err(ApplicationError::OperationTimedOut(timeout).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SynoError;
    use crate::transport::cancellable;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let cancel = CancellationToken::new();
        let value = with_deadline(Duration::from_secs(5), &cancel, |_| async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_expiry_cancels_operation() {
        let cancel = CancellationToken::new();
        let err = with_deadline(Duration::from_millis(20), &cancel, |token| async move {
            cancellable(&token, std::future::pending::<reqwest::Result<()>>()).await
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            SynoError::Application(ApplicationError::OperationTimedOut(_))
        ));
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_parent_cancellation_reported_as_canceled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = with_deadline(Duration::from_secs(5), &cancel, |token| async move {
            cancellable(&token, std::future::pending::<reqwest::Result<()>>()).await
        })
        .await
        .unwrap_err();
        assert!(err.is_canceled());
    }
}
