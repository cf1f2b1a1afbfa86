//! Which parts of the pipeline this worker process runs.

use issuehub_events::queue::email_queue_key;

use crate::config::WorkerConfig;

/// Duties of one worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRoles {
    /// Queues popped, highest priority first.
    pub consume_keys: Vec<String>,
    /// Whether the email stacker runs here.
    pub run_stacker: bool,
}

impl WorkerRoles {
    /// Without a mail transport the worker neither claims email log rows nor
    /// pops send tasks; both are left for workers that can deliver them.
    pub fn new(config: &WorkerConfig, email_enabled: bool) -> Self {
        let mut consume_keys = vec![config.task_queue_key.clone()];
        if email_enabled {
            consume_keys.push(email_queue_key(&config.task_queue_key));
        }
        Self {
            consume_keys,
            run_stacker: email_enabled,
        }
    }
}
