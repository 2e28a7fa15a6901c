//! # Command Scheduler
//!
//! Runs `Command::Run` tasks off the event loop. Each task gets two spawned
//! futures, both on one `TaskTracker`:
//!
//! ```text
//! worker      provider call, raced against its cancellation token
//! supervisor  awaits the worker, enforces the timeout, posts the result
//! ```
//!
//! On timeout the supervisor posts `Message::TimedOut`, cancels the worker,
//! and keeps waiting. Cancellation is best-effort: whatever the worker
//! eventually returns is still posted as `Message::Completed`, and the model
//! drops it because the epoch is no longer in flight.
//!
//! Results only ever reach the model through the loop's queue.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::boundary::panic_message;
use crate::core::command::{Epoch, Operation, Payload, Task};
use crate::core::error::CommandError;
use crate::core::message::Message;
use crate::data::DataProvider;

struct Running {
    token: CancellationToken,
    write: bool,
}

pub struct CommandScheduler {
    provider: Arc<dyn DataProvider>,
    tx: UnboundedSender<Message>,
    tracker: TaskTracker,
    root: CancellationToken,
    running: HashMap<Epoch, Running>,
}

impl CommandScheduler {
    pub fn new(provider: Arc<dyn DataProvider>, tx: UnboundedSender<Message>) -> Self {
        Self {
            provider,
            tx,
            tracker: TaskTracker::new(),
            root: CancellationToken::new(),
            running: HashMap::new(),
        }
    }

    pub fn dispatch(&mut self, task: Task) {
        let Task {
            epoch,
            operation,
            timeout,
        } = task;
        let label = operation.label();
        debug!("Scheduling epoch {epoch}: {label} via {}", self.provider.name());

        let token = self.root.child_token();
        self.running.insert(
            epoch,
            Running {
                token: token.clone(),
                write: operation.is_write(),
            },
        );

        let worker = self
            .tracker
            .spawn(run_worker(self.provider.clone(), operation, token.clone()));
        self.tracker.spawn(supervise(
            worker,
            epoch,
            label,
            timeout,
            token,
            self.tx.clone(),
        ));
    }

    /// Signal the task for `epoch` to stop. Its result may still arrive.
    pub fn cancel(&mut self, epoch: Epoch) {
        if let Some(running) = self.running.remove(&epoch) {
            debug!("Cancelling epoch {epoch}");
            running.token.cancel();
        }
    }

    /// The loop saw the final message for `epoch`.
    pub fn forget(&mut self, epoch: Epoch) {
        self.running.remove(&epoch);
    }

    /// Tasks dispatched and not yet settled.
    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Stop accepting work, cancel reads, give writes `grace` to finish, then
    /// cancel whatever is left.
    pub async fn shutdown(&mut self, grace: Duration) {
        self.tracker.close();
        for (epoch, running) in &self.running {
            if !running.write {
                debug!("Cancelling read epoch {epoch} for shutdown");
                running.token.cancel();
            }
        }
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            warn!(
                "{} task(s) still running after {:?}, cancelling",
                self.tracker.len(),
                grace
            );
            self.root.cancel();
            if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
                warn!("Abandoning {} task(s) that ignored cancellation", self.tracker.len());
            }
        }
        self.running.clear();
        info!("Scheduler stopped");
    }
}

async fn run_worker(
    provider: Arc<dyn DataProvider>,
    operation: Operation,
    token: CancellationToken,
) -> Result<Payload, CommandError> {
    let work = AssertUnwindSafe(async move { operation.run(provider.as_ref()).await }).catch_unwind();
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(CommandError::Cancelled),
        outcome = work => match outcome {
            Ok(result) => result.map_err(CommandError::from),
            Err(payload) => Err(CommandError::Panicked(panic_message(payload.as_ref()))),
        },
    }
}

async fn supervise(
    mut worker: JoinHandle<Result<Payload, CommandError>>,
    epoch: Epoch,
    label: String,
    timeout: Option<Duration>,
    token: CancellationToken,
    tx: UnboundedSender<Message>,
) {
    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut worker).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!("{label} (epoch {epoch}) timed out after {limit:?}");
                let _ = tx.send(Message::TimedOut {
                    epoch,
                    operation: label.clone(),
                    after: limit,
                });
                token.cancel();
                worker.await
            }
        },
        None => worker.await,
    };

    let result = joined.unwrap_or_else(|e| {
        if e.is_panic() {
            Err(CommandError::Panicked(panic_message(e.into_panic().as_ref())))
        } else {
            Err(CommandError::Cancelled)
        }
    });
    if tx.send(Message::Completed { epoch, result }).is_err() {
        debug!("Loop is gone, dropping result for epoch {epoch}");
    }
}
