use std::fmt::Display;
use std::future::Future;

use tracing::warn;

/// What came out of [`run_sequential`]: results of the items that succeeded,
/// in input order, alongside the errors of the ones that did not.
#[derive(Debug)]
pub struct BatchResults<R, E> {
    pub succeeded: Vec<R>,
    pub failed: Vec<E>,
}

impl<R, E> BatchResults<R, E> {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn into_succeeded(self) -> Vec<R> {
        self.succeeded
    }
}

/// Runs `op` over `items` strictly one at a time, awaiting each operation
/// before starting the next. The serialization is deliberate backpressure,
/// not an optimization: callers use this to avoid firing a burst of requests
/// at a service.
///
/// A failed item is logged and collected into [`BatchResults::failed`]; it
/// never aborts the rest of the batch.
pub async fn run_sequential<T, R, E, F, Fut>(
    items: impl IntoIterator<Item = T>,
    mut op: F,
) -> BatchResults<R, E>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: Display,
{
    let mut results = BatchResults {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };

    for item in items {
        match op(item).await {
            Ok(r) => results.succeeded.push(r),
            Err(e) => {
                warn!("batch operation failed, continuing with the next item: {}", e);
                results.failed.push(e);
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[tokio::test]
    async fn failures_are_collected_and_do_not_abort_the_batch() {
        let results = run_sequential(vec![1, 2, 3], |n| async move {
            if n == 2 {
                Err(format!("boom {}", n))
            } else {
                Ok(n * 10)
            }
        })
        .await;

        assert_eq!(vec![10, 30], results.succeeded);
        assert_eq!(vec!["boom 2".to_string()], results.failed);
        assert!(!results.is_complete());
    }

    #[tokio::test]
    async fn empty_input_never_invokes_the_operation() {
        let calls = Cell::new(0);
        let results = run_sequential(Vec::<u32>::new(), |_| {
            calls.set(calls.get() + 1);
            async { Ok::<_, String>(0) }
        })
        .await;

        assert!(results.succeeded.is_empty());
        assert!(results.is_complete());
        assert_eq!(0, calls.get());
    }

    #[tokio::test]
    async fn operations_run_one_at_a_time() {
        let log: RefCell<Vec<String>> = RefCell::new(Vec::new());

        let results = run_sequential(vec!["a", "b"], |item| {
            log.borrow_mut().push(format!("start {}", item));
            let log = &log;
            async move {
                // Yield so an eagerly-started second operation would get a
                // chance to interleave.
                tokio::task::yield_now().await;
                log.borrow_mut().push(format!("end {}", item));
                Ok::<_, String>(item)
            }
        })
        .await;

        assert_eq!(vec!["a", "b"], results.into_succeeded());
        assert_eq!(
            vec!["start a", "end a", "start b", "end b"],
            log.into_inner()
        );
    }
}
