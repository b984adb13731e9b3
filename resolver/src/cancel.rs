//! Cancellation plumbing shared by every fan-out in the resolver.

use crate::error::Error;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Race `fut` against `token`. Cancellation observed before (or at the same
/// time as) `fut` resolving always reports [`Error::Cancelled`], never
/// whatever `fut` itself produced — the core's "cancellation takes
/// precedence over concurrent store errors" rule.
pub async fn cancellable<T>(token: &CancellationToken, fut: impl Future<Output = Result<T, Error>>) -> Result<T, Error> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::Cancelled),
        res = fut => res,
    }
}

/// Collapse a fan-out's per-item results per the failure-containment rule:
/// cancellation wins over any other error, otherwise the first non-cancellation
/// error wins, otherwise every item's success value is kept.
///
/// A successful item contributes nothing once any item failed: callers pass
/// only `Ok` values through `f` and this function discards them on failure.
pub fn collapse_fan_out<T>(results: Vec<Result<T, Error>>) -> Result<Vec<T>, Error> {
    let mut first_error: Option<Error> = None;
    let mut saw_cancelled = false;
    let mut out = Vec::with_capacity(results.len());

    for result in results {
        match result {
            Ok(v) => out.push(v),
            Err(Error::Cancelled) => saw_cancelled = true,
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if saw_cancelled {
        return Err(Error::Cancelled);
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancellable_reports_cancelled_even_if_future_already_ready() {
        let token = CancellationToken::new();
        token.cancel();
        let result = cancellable(&token, async { Ok(42) }).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn cancellable_passes_through_when_not_cancelled() {
        let token = CancellationToken::new();
        let result = cancellable(&token, async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn collapse_prefers_cancelled_over_other_errors() {
        let results: Vec<Result<i32, Error>> = vec![
            Ok(1),
            Err(Error::Internal("boom".to_string())),
            Err(Error::Cancelled),
        ];
        assert!(matches!(collapse_fan_out(results), Err(Error::Cancelled)));
    }

    #[test]
    fn collapse_returns_first_error_when_not_cancelled() {
        let results: Vec<Result<i32, Error>> = vec![
            Ok(1),
            Err(Error::Internal("first".to_string())),
            Err(Error::Internal("second".to_string())),
        ];
        match collapse_fan_out(results) {
            Err(Error::Internal(msg)) => assert_eq!(msg, "first"),
            other => panic!("expected Internal(\"first\"), got {other:?}"),
        }
    }

    #[test]
    fn collapse_returns_all_successes_when_nothing_failed() {
        let results: Vec<Result<i32, Error>> = vec![Ok(1), Ok(2), Ok(3)];
        assert_eq!(collapse_fan_out(results).unwrap(), vec![1, 2, 3]);
    }
}
