//! Single-worker serial job queue.
//!
//! A `SerialWorker<C>` owns a context `C` on a dedicated thread and runs
//! submitted jobs against it one at a time, in submission order. Callers
//! `await` a oneshot reply, so no async task blocks on filesystem or
//! secure-storage I/O.
//!
//! The queue is unbounded and jobs cannot be cancelled once dequeued.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread;

use tokio::sync::{mpsc, oneshot};

use crate::error::{Result, StoreError};

type Job<C> = Box<dyn FnOnce(&mut C) + Send + 'static>;

/// Handle for submitting jobs to a worker. Cloning shares the same queue.
pub struct SerialWorker<C> {
    tx: mpsc::UnboundedSender<Job<C>>,
}

impl<C> Clone for SerialWorker<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<C: Send + 'static> SerialWorker<C> {
    /// Spawn the worker thread. It exits once every handle is dropped.
    ///
    /// # Errors
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn(name: &str, mut context: C) -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job<C>>();
        let thread_name = name.to_string();

        thread::Builder::new().name(thread_name.clone()).spawn(move || {
            while let Some(job) = rx.blocking_recv() {
                // A panicking job drops its reply sender; the queue keeps going.
                if catch_unwind(AssertUnwindSafe(|| job(&mut context))).is_err() {
                    tracing::error!(worker = %thread_name, "job panicked");
                }
            }
            tracing::debug!(worker = %thread_name, "worker queue closed");
        })?;

        Ok(Self { tx })
    }

    /// Enqueue `job` and wait for its result.
    ///
    /// # Errors
    /// Returns `WorkerStopped` if the worker is gone or the job panicked.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut C) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Box::new(move |context: &mut C| {
                // The caller may have gone away; nothing to do then.
                let _ = reply_tx.send(job(context));
            }))
            .map_err(|_| StoreError::WorkerStopped)?;

        reply_rx.await.map_err(|_| StoreError::WorkerStopped)
    }
}
