//! Single-retry policy for transient storage failures.

use crate::StoreError;
use tracing::warn;

/// Run a storage operation, retrying exactly once if it reports a
/// transient [`StoreError::Unavailable`] failure.
///
/// Any other error, and a second `Unavailable`, propagate to the caller
/// untouched; the node cannot safely continue without durable storage, so
/// the caller escalates to a fatal exit.
pub fn retry_once<T, F>(mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Result<T, StoreError>,
{
    match op() {
        Err(StoreError::Unavailable(reason)) => {
            warn!(%reason, "transient storage failure, retrying once");
            op()
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn passes_through_success() {
        assert_eq!(retry_once(|| Ok::<_, StoreError>(7)).unwrap(), 7);
    }

    #[test]
    fn retries_once_on_transient_failure() {
        let calls = Cell::new(0);
        let result = retry_once(|| {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(StoreError::Unavailable("connection reset".into()))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn second_transient_failure_propagates() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_once(|| {
            calls.set(calls.get() + 1);
            Err(StoreError::Unavailable("still down".into()))
        });
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn non_transient_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_once(|| {
            calls.set(calls.get() + 1);
            Err(StoreError::Corruption("bad page".into()))
        });
        assert!(matches!(result, Err(StoreError::Corruption(_))));
        assert_eq!(calls.get(), 1);
    }
}
