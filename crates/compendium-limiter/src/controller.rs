use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::ensure;
use compendium_core::config::LimiterSettings;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::backoff::BackoffPolicy;
use crate::error::AdmissionError;

type Job = BoxFuture<'static, ()>;

/// Runs tasks at no more than `tasks_per_second`, with at most
/// `max_concurrent` of them in flight.
///
/// Submissions queue up unbounded. A pacer moves one job per interval into a
/// single-slot hand-off that workers drain; the pacer cannot move the next job
/// until a worker has taken the previous one.
pub struct AdmissionController {
    ingress: mpsc::UnboundedSender<Job>,
    pacer: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    backoff: BackoffPolicy,
}

impl AdmissionController {
    /// Spawns the pacer and workers on the current tokio runtime.
    pub fn new(tasks_per_second: f64, max_concurrent: usize, backoff: BackoffPolicy) -> anyhow::Result<Self> {
        ensure!(tasks_per_second.is_finite() && tasks_per_second > 0.0, "tasks_per_second must be positive, got {tasks_per_second}");
        ensure!(max_concurrent >= 1, "max_concurrent must be at least 1");
        let interval = Duration::from_secs_f64(1.0 / tasks_per_second);

        let (ingress, queued) = mpsc::unbounded_channel::<Job>();
        let (paced_tx, paced_rx) = mpsc::channel::<Job>(1);
        let paced_rx = Arc::new(Mutex::new(paced_rx));

        let pacer = tokio::spawn(pace(queued, paced_tx, interval));
        let workers = (0..max_concurrent).map(|_| tokio::spawn(work(paced_rx.clone()))).collect();
        tracing::debug!(tasks_per_second, max_concurrent, "admission controller started");
        Ok(Self { ingress, pacer, workers, backoff })
    }

    pub fn from_settings(settings: &LimiterSettings) -> anyhow::Result<Self> {
        ensure!(settings.backoff_unit_secs.is_finite() && settings.backoff_unit_secs >= 0.0, "backoff_unit_secs must not be negative");
        let backoff = BackoffPolicy::new(Duration::from_secs_f64(settings.backoff_unit_secs));
        Self::new(settings.tasks_per_second, settings.max_concurrent, backoff)
    }

    /// Queues a task and resolves to its result.
    ///
    /// `factory` is called once per attempt. An attempt failing with
    /// [`AdmissionError::RateLimitExceeded`] is retried after a backoff, without
    /// limit; any other outcome is returned as is. The task is queued before
    /// this returns, so the returned future may be awaited later.
    pub fn execute<T, F, Fut>(&self, factory: F) -> impl Future<Output = Result<T, AdmissionError>> + Send + 'static
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, AdmissionError>> + Send + 'static,
    {
        let (done, result) = oneshot::channel();
        let backoff = self.backoff;
        let job = async move {
            // The caller may have stopped listening; the task still ran.
            let _ = done.send(run_with_retry(factory, backoff).await);
        }
        .boxed();
        let queued = self.ingress.send(job).is_ok();
        async move {
            if !queued {
                return Err(AdmissionError::Closed);
            }
            result.await.map_err(|_| AdmissionError::Closed)?
        }
    }

    /// Waits for every queued task to be handed out and finished, then shuts
    /// the pacer and workers down.
    pub async fn stop(self) {
        drop(self.ingress);
        if let Err(e) = self.pacer.await {
            tracing::error!(error = %e, "pacer task failed");
        }
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "worker task failed");
            }
        }
        tracing::debug!("admission controller stopped");
    }
}

async fn pace(mut queued: mpsc::UnboundedReceiver<Job>, paced: mpsc::Sender<Job>, interval: Duration) {
    while let Some(job) = queued.recv().await {
        if paced.send(job).await.is_err() {
            break;
        }
        tokio::time::sleep(interval).await;
    }
}

async fn work(paced: Arc<Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let next = paced.lock().await.recv().await;
        let Some(job) = next else { break };
        job.await;
    }
}

async fn run_with_retry<T, F, Fut>(mut factory: F, backoff: BackoffPolicy) -> Result<T, AdmissionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdmissionError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match factory().await {
            Err(AdmissionError::RateLimitExceeded) => {
                attempt = attempt.saturating_add(1);
                let wait = backoff.delay(attempt);
                tracing::warn!(attempt, wait_secs = wait.as_secs_f64(), "rate limit exceeded, backing off");
                tokio::time::sleep(wait).await;
            }
            outcome => return outcome,
        }
    }
}
