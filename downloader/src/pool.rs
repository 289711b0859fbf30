//! This module provides the fixed-size worker pool running fetch tasks.

use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{self, Future, FutureExt};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

type Task = future::BoxFuture<'static, ()>;

/// The pool has no worker left to run a task.
#[derive(Debug, Error)]
#[error("worker pool is closed")]
pub struct PoolClosed;

/// A pool of `size` workers draining a shared, unbounded task queue.
///
/// Tasks are picked up in submission order by the next idle worker, so at most `size` of them run at once.
/// A panicking task is logged and does not take its worker down.
///
/// ```
/// # tokio_test::block_on(async {
/// # use std::num::NonZeroUsize;
/// # use downloader::pool::WorkerPool;
/// let pool = WorkerPool::start(NonZeroUsize::new(3).unwrap());
///
/// for i in 0..=5 {
///     pool.submit(async move { println!("Hello from task #{i}!") }).unwrap();
/// }
///
/// pool.close().await.unwrap();
/// # })
/// ```
#[derive(Debug)]
pub struct WorkerPool {
    /// The pool of workers.
    workers: Vec<Worker>,
    /// The sending part of the queue, the next idle worker waits for a task to be received through it.
    sender: mpsc::UnboundedSender<Task>,
}

impl WorkerPool {
    /// Start a pool with `size` workers.
    pub fn start(size: NonZeroUsize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        let receiver = Arc::new(Mutex::new(receiver));

        static WORKER_ID: AtomicUsize = AtomicUsize::new(0);
        let size = size.get();
        let id = WORKER_ID.fetch_add(size, Ordering::Relaxed);

        let workers = (0..size).map(|i| Worker::new(id.wrapping_add(i), Arc::clone(&receiver))).collect();

        Self { workers, sender }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a task, to be run by the next idle worker.
    pub fn submit(&self, task: impl Future<Output = ()> + Send + 'static) -> Result<(), PoolClosed> {
        self.sender.send(task.boxed()).map_err(|_| PoolClosed)
    }

    /// Close the queue and wait for every queued task to complete.
    pub async fn close(self) -> Result<(), tokio::task::JoinError> {
        let Self { workers, sender } = self;
        drop(sender);

        future::try_join_all(workers.into_iter().inspect(|worker| {
            tracing::debug!("Stopping worker {}...", worker.id);
        }))
        .await?;

        Ok(())
    }
}

#[derive(Debug)]
struct Worker {
    id: usize,
    handle: tokio::task::JoinHandle<()>,
}

impl Worker {
    fn new(id: usize, receiver: Arc<Mutex<mpsc::UnboundedReceiver<Task>>>) -> Worker {
        tracing::debug!("Starting worker {id}...");

        Worker {
            id,
            handle: tokio::spawn(async move {
                loop {
                    let message = receiver.lock().await.recv().await;

                    match message {
                        Some(task) => {
                            tracing::trace!("Executing task on worker {id}...");

                            if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                                tracing::error!("Task panicked on worker {id}");
                            }
                        }
                        None => {
                            tracing::debug!("All tasks exhausted, shutting down worker {id}.");
                            break;
                        }
                    }
                }
            }),
        }
    }
}

impl Future for Worker {
    type Output = Result<(), tokio::task::JoinError>;

    #[inline]
    fn poll(mut self: std::pin::Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<Self::Output> {
        self.handle.poll_unpin(cx)
    }
}
