//! Scoped execution of a unit of work.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::Instant;
use tracing::{instrument, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::repository::UnitOfWork;

/// Run `action` inside a fresh session and commit it.
///
/// Opening the session, the action and the commit share one deadline of
/// `limit`. If the action fails, the commit fails, or the deadline passes, the
/// session is aborted and the error is returned unchanged (an expired limit
/// surfaces as [`CatalogError::StorageUnavailable`]). An abort failure is
/// logged and never replaces the triggering error.
///
/// ```ignore
/// let product = unit_of_work::run(&uow, limit, move |session| {
///     Box::pin(async move { products.create(session, draft).await })
/// })
/// .await?;
/// ```
#[instrument(skip_all, fields(limit_ms = limit.as_millis() as u64))]
pub async fn run<U, T, F>(unit_of_work: &U, limit: Duration, action: F) -> CatalogResult<T>
where
    U: UnitOfWork + ?Sized,
    T: Send,
    F: for<'s> FnOnce(&'s mut U::Session) -> BoxFuture<'s, CatalogResult<T>> + Send,
{
    let deadline = Instant::now()
        .checked_add(limit)
        .unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400 * 365));

    let mut session = match tokio::time::timeout_at(deadline, unit_of_work.begin()).await {
        Ok(session) => session?,
        Err(_) => {
            warn!("Unit of work could not begin in time");
            return Err(expired(limit));
        }
    };

    let attempt = tokio::time::timeout_at(deadline, async {
        let value = action(&mut session).await?;
        unit_of_work.commit(&mut session).await?;
        Ok::<T, CatalogError>(value)
    })
    .await;

    let err = match attempt {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(err)) => err,
        Err(_) => expired(limit),
    };

    warn!(error = %err, "Rolling back unit of work");
    if let Err(abort_err) = unit_of_work.abort(&mut session).await {
        warn!(error = %abort_err, "Abort after failed unit of work also failed");
    }
    Err(err)
}

fn expired(limit: Duration) -> CatalogError {
    CatalogError::storage(format!(
        "unit of work did not commit within {} ms",
        limit.as_millis()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the lifecycle calls it receives
    #[derive(Default)]
    struct RecordingUnitOfWork {
        calls: Mutex<Vec<&'static str>>,
        fail_commit: bool,
        stall_begin: bool,
    }

    impl RecordingUnitOfWork {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UnitOfWork for RecordingUnitOfWork {
        type Session = Vec<&'static str>;

        async fn begin(&self) -> CatalogResult<Self::Session> {
            self.calls.lock().unwrap().push("begin");
            if self.stall_begin {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(Vec::new())
        }

        async fn commit(&self, _session: &mut Self::Session) -> CatalogResult<()> {
            self.calls.lock().unwrap().push("commit");
            if self.fail_commit {
                return Err(CatalogError::storage("commit refused"));
            }
            Ok(())
        }

        async fn abort(&self, _session: &mut Self::Session) -> CatalogResult<()> {
            self.calls.lock().unwrap().push("abort");
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_success_commits() {
        let uow = RecordingUnitOfWork::default();
        let value = run(&uow, Duration::from_secs(1), |session| {
            Box::pin(async move {
                session.push("write");
                Ok(42)
            })
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(uow.calls(), vec!["begin", "commit"]);
    }

    #[tokio::test]
    async fn test_action_failure_aborts_and_propagates() {
        let uow = RecordingUnitOfWork::default();
        let result: CatalogResult<()> = run(&uow, Duration::from_secs(1), |_session| {
            Box::pin(async move { Err(CatalogError::validation("name", "", "Name is required")) })
        })
        .await;

        assert!(matches!(result, Err(CatalogError::Validation { .. })));
        assert_eq!(uow.calls(), vec!["begin", "abort"]);
    }

    #[tokio::test]
    async fn test_commit_failure_aborts() {
        let uow = RecordingUnitOfWork {
            fail_commit: true,
            ..Default::default()
        };
        let result = run(&uow, Duration::from_secs(1), |_session| {
            Box::pin(async move { Ok(()) })
        })
        .await;

        assert!(matches!(result, Err(CatalogError::StorageUnavailable(_))));
        assert_eq!(uow.calls(), vec!["begin", "commit", "abort"]);
    }

    #[tokio::test]
    async fn test_timeout_aborts_as_storage_unavailable() {
        let uow = RecordingUnitOfWork::default();
        let result = run(&uow, Duration::from_millis(20), |_session| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
        })
        .await;

        match result {
            Err(CatalogError::StorageUnavailable(details)) => {
                assert!(details.contains("did not commit"))
            }
            other => panic!("expected StorageUnavailable, got {other:?}"),
        }
        assert_eq!(uow.calls(), vec!["begin", "abort"]);
    }

    #[tokio::test]
    async fn test_stalled_begin_is_bounded_by_limit() {
        let uow = RecordingUnitOfWork {
            stall_begin: true,
            ..Default::default()
        };
        let started = Instant::now();
        let result = run(&uow, Duration::from_millis(20), |_session| {
            Box::pin(async move { Ok(()) })
        })
        .await;

        assert!(matches!(result, Err(CatalogError::StorageUnavailable(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
        // No session was opened, so there is nothing to abort.
        assert_eq!(uow.calls(), vec!["begin"]);
    }
}
