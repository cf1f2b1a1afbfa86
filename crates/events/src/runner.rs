//! Task execution loop.
//!
//! [`TaskRunner::run`] pops envelopes from the shared queue and executes
//! up to `concurrency` of them at a time. Cancellation stops popping and
//! waits for in-flight tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::builder::NotificationBuilder;
use crate::delivery::email::MailTransport;
use crate::dispatch::{DeliveryStore, DispatchOutcome, EmailDispatcher};
use crate::queue::{Task, TaskEnvelope};
use crate::store::{KeyValueStore, RedisTaskConsumer, StoreError};

/// How long one blocking pop waits before re-checking cancellation.
const POP_TIMEOUT: Duration = Duration::from_secs(5);

/// Back-off after a failed pop.
const POP_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Result of executing one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Built,
    /// The event type is not fanned out.
    Skipped,
    /// Email delivery is not configured on this worker.
    EmailDisabled,
    Dispatched(DispatchOutcome),
    Failed,
}

/// Where the runner takes tasks from.
pub trait TaskSource: Send {
    /// Wait up to `timeout` for the next task.
    fn pop(
        &mut self,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<Option<TaskEnvelope>, StoreError>> + Send;
}

impl TaskSource for RedisTaskConsumer {
    async fn pop(&mut self, timeout: Duration) -> Result<Option<TaskEnvelope>, StoreError> {
        RedisTaskConsumer::pop(self, timeout).await
    }
}

pub struct TaskRunner<S, K, M> {
    builder: NotificationBuilder,
    dispatcher: Option<EmailDispatcher<S, K, M>>,
}

impl<S, K, M> TaskRunner<S, K, M>
where
    S: DeliveryStore + 'static,
    K: KeyValueStore + 'static,
    M: MailTransport + 'static,
{
    pub fn new(builder: NotificationBuilder, dispatcher: Option<EmailDispatcher<S, K, M>>) -> Self {
        Self {
            builder,
            dispatcher,
        }
    }

    /// Execute a single envelope. Failures are logged by the handlers.
    pub async fn execute(&self, envelope: TaskEnvelope) -> TaskOutcome {
        tracing::debug!(task_id = %envelope.id, kind = envelope.task.kind(), "Executing task");

        match envelope.task {
            Task::IssueActivity(event) => match self.builder.handle(&event).await {
                Some(summary) if summary.skipped => TaskOutcome::Skipped,
                Some(_) => TaskOutcome::Built,
                None => TaskOutcome::Failed,
            },
            Task::SendEmail(job) => match &self.dispatcher {
                Some(dispatcher) => TaskOutcome::Dispatched(dispatcher.send(&job).await),
                None => {
                    tracing::error!(
                        issue_id = job.issue_id,
                        receiver_id = job.receiver_id,
                        email_notification_ids = ?job.email_notification_ids,
                        "Send task reached a worker without email delivery"
                    );
                    TaskOutcome::EmailDisabled
                }
            },
        }
    }

    /// Consume tasks until `cancel` fires. Returns the number of tasks
    /// executed.
    ///
    /// A pop is never abandoned midway: cancellation is checked between pops,
    /// so a task handed out by the queue is always executed.
    pub async fn run<T: TaskSource>(
        self: Arc<Self>,
        mut source: T,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> usize {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut in_flight = JoinSet::new();
        let mut executed = 0;

        tracing::info!(concurrency, email = self.dispatcher.is_some(), "Task runner started");

        while !cancel.is_cancelled() {
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            match source.pop(POP_TIMEOUT).await {
                Ok(Some(envelope)) => {
                    executed += 1;
                    let runner = Arc::clone(&self);
                    in_flight.spawn(async move {
                        let _permit = permit;
                        runner.execute(envelope).await
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Failed to pop task");
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(POP_ERROR_BACKOFF) => {}
                    }
                }
            }

            // Reap finished tasks.
            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Task panicked");
                }
            }
        }

        tracing::info!(in_flight = in_flight.len(), "Task runner draining");
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Task panicked");
            }
        }
        tracing::info!(executed, "Task runner stopped");
        executed
    }
}
