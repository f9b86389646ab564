//! Fan-out/fan-in over independent workers.
//!
//! Every item gets its own task. Each task reports exactly one outcome on
//! either the success or the failure channel. A supervisor task joins all
//! workers and only then drops its senders, so the channels close
//! after the last worker has finished. The caller drains both channels once
//! they are closed. Channels are unbounded: no worker ever waits for a reader.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Outcomes collected from one fan-out.
#[derive(Debug)]
pub struct Gathered<T, E> {
    pub succeeded: Vec<T>,
    pub failed: Vec<E>,
    /// Workers stopped by the cancellation token before reporting.
    pub cancelled: usize,
}

impl<T, E> Gathered<T, E> {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.cancelled
    }
}

/// Run `worker` once per item, concurrently, and gather every outcome.
///
/// Workers still running when `cancel` fires are dropped and counted in
/// [`Gathered::cancelled`].
pub async fn scatter_gather<I, W, Fut, T, E>(
    items: I,
    cancel: &CancellationToken,
    worker: W,
) -> Gathered<T, E>
where
    I: IntoIterator,
    W: Fn(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let (ok_tx, mut ok_rx) = mpsc::unbounded_channel();
    let (err_tx, mut err_rx) = mpsc::unbounded_channel();
    let mut tasks = JoinSet::new();

    for item in items {
        let work = worker(item);
        let ok_tx = ok_tx.clone();
        let err_tx = err_tx.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => false,
                outcome = work => {
                    match outcome {
                        Ok(value) => {
                            let _ = ok_tx.send(value);
                        }
                        Err(error) => {
                            let _ = err_tx.send(error);
                        }
                    }
                    true
                }
            }
        });
    }

    let supervisor = tokio::spawn(async move {
        let mut cancelled = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => {}
                Ok(false) => cancelled += 1,
                Err(e) => tracing::error!(error = %e, "Worker task aborted"),
            }
        }
        drop(ok_tx);
        drop(err_tx);
        cancelled
    });

    let mut succeeded = Vec::new();
    while let Some(value) = ok_rx.recv().await {
        succeeded.push(value);
    }
    let mut failed = Vec::new();
    while let Some(error) = err_rx.recv().await {
        failed.push(error);
    }

    let cancelled = match supervisor.await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(error = %e, "Fan-out supervisor aborted");
            0
        }
    };

    Gathered {
        succeeded,
        failed,
        cancelled,
    }
}
