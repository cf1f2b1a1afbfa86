use std::sync::Arc;

use anyhow::Context;
use issuehub_events::{
    EmailConfig, EmailDispatcher, EmailStacker, NotificationBuilder, PgDeliveryStore,
    RedisStore, RedisTaskConsumer, RedisTaskQueue, SmtpMailer, TaskRunner,
};
use issuehub_worker::config::WorkerConfig;
use issuehub_worker::roles::WorkerRoles;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::from_env()?;
    tracing::info!(
        concurrency = config.concurrency,
        queue = %config.task_queue_key,
        stack_interval_secs = config.stack_interval.as_secs(),
        "Worker starting"
    );

    let pool = issuehub_db::create_pool(&config.database_url)
        .await
        .context("failed to connect to the database")?;
    issuehub_db::health_check(&pool).await?;
    issuehub_db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let redis = redis::Client::open(config.redis_url.as_str()).context("invalid REDIS_URL")?;
    let kv = RedisStore::connect(&redis).await?;
    let queue = RedisTaskQueue::connect(&redis, config.task_queue_key.clone()).await?;
    let dispatcher = match EmailConfig::from_env() {
        Some(email) => {
            let mailer = SmtpMailer::new(&email)?;
            tracing::info!(host = %email.smtp_host, port = email.smtp_port, "Email delivery enabled");
            Some(
                EmailDispatcher::new(PgDeliveryStore::new(pool.clone()), kv, mailer, config.web_url.clone())
                    .with_lock_ttl(config.lock_ttl),
            )
        }
        None => {
            tracing::warn!("SMTP_HOST not set, email delivery disabled");
            None
        }
    };

    let roles = WorkerRoles::new(&config, dispatcher.is_some());
    let consumer = RedisTaskConsumer::connect(&redis, roles.consume_keys.clone()).await?;
    tracing::info!(queues = ?roles.consume_keys, stacker = roles.run_stacker, "Worker roles");

    let runner = Arc::new(TaskRunner::new(NotificationBuilder::new(pool.clone()), dispatcher));
    let cancel = CancellationToken::new();

    let runner_handle = tokio::spawn(runner.run(consumer, config.concurrency, cancel.clone()));
    let stacker_handle = roles.run_stacker.then(|| {
        let stacker = EmailStacker::new(pool.clone(), queue, config.stack_interval);
        let cancel = cancel.clone();
        tokio::spawn(async move { stacker.run(cancel).await })
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    cancel.cancel();

    runner_handle.await.context("task runner panicked")?;
    if let Some(handle) = stacker_handle {
        handle.await.context("email stacker panicked")?;
    }

    pool.close().await;
    tracing::info!("Worker stopped");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "issuehub_worker=debug,issuehub_events=debug,info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
