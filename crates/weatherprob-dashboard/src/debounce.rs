//! Trailing-edge debouncer on the tokio runtime.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Runs only the last of a burst of calls, `delay` after that call.
///
/// Each run receives a token that is cancelled as soon as a newer call
/// arrives, so in-flight work started by a superseded run can abort and must
/// not publish its result.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn call<F, Fut>(&self, run: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending.lock().replace(token.clone()) {
            previous.cancel();
        }

        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            run(token).await;
        });
    }

    /// Cancel whatever is pending or running.
    pub fn cancel(&self) {
        if let Some(token) = self.pending.lock().take() {
            token.cancel();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_once_with_last_value() {
        let debouncer = Debouncer::new(Duration::from_millis(1500));
        let runs = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicUsize::new(0));

        for i in 1..=5 {
            let runs = runs.clone();
            let last = last.clone();
            debouncer.call(move |_| async move {
                runs.fetch_add(1, Ordering::SeqCst);
                last.store(i, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_runs_before_delay() {
        let debouncer = Debouncer::new(Duration::from_millis(1500));
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = runs.clone();
        debouncer.call(move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_call_cancels_running_token() {
        let debouncer = Debouncer::new(Duration::from_millis(10));
        let observed = Arc::new(Mutex::new(None::<CancellationToken>));

        let slot = observed.clone();
        debouncer.call(move |token| async move {
            *slot.lock() = Some(token);
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        debouncer.call(|_| async {});
        let first = observed.lock().clone().unwrap();
        assert!(first.is_cancelled());
    }
}
