//! Timer-reset debouncing for search input

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Runs only the last scheduled action once `delay` passes without a new one.
///
/// Scheduling or cancelling only drops an action still waiting out its delay.
/// Once the delay has passed the action runs on its own task to completion;
/// callers discard superseded results themselves.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(action);
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(task) = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
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
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn only_last_action_runs() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let runs = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicUsize::new(0));

        for i in 1..=3 {
            let runs = runs.clone();
            let last = last.clone();
            debouncer.schedule(async move {
                runs.fetch_add(1, Ordering::SeqCst);
                last.store(i, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn started_action_survives_later_schedule() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let release = Arc::new(tokio::sync::Notify::new());
        let finished = Arc::new(AtomicUsize::new(0));

        let (gate, done) = (release.clone(), finished.clone());
        debouncer.schedule(async move {
            gate.notified().await;
            done.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(301)).await;

        debouncer.schedule(async {});
        debouncer.cancel();
        release.notify_one();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_action() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        debouncer.schedule(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
