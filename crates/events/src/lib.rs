//! Issue activity notification pipeline.
//!
//! - [`NotificationBuilder`] turns an activity batch into subscriptions,
//!   in-app notifications and email log rows.
//! - [`EmailStacker`] periodically groups pending email log rows per receiver
//!   and issue and enqueues one [`Task::SendEmail`] per group.
//! - [`EmailDispatcher`] sends a stacked email under a distributed lock.
//! - [`TaskRunner`] pops tasks from the shared queue and executes them.

pub mod builder;
pub mod delivery;
pub mod dispatch;
pub mod fanout;
pub mod lock;
pub mod queue;
pub mod render;
pub mod runner;
pub mod stacking;
pub mod store;

pub use builder::{BuildError, NotificationBuilder};
pub use delivery::email::{EmailConfig, EmailError, MailTransport, SmtpMailer};
pub use dispatch::{DeliveryStore, DispatchOutcome, EmailDispatcher, PgDeliveryStore};
pub use queue::{EmailJob, Task, TaskEnvelope, TaskQueue};
pub use runner::{TaskOutcome, TaskRunner, TaskSource};
pub use stacking::EmailStacker;
pub use store::{KeyValueStore, RedisStore, RedisTaskConsumer, RedisTaskQueue, StoreError};
