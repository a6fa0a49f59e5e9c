use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use billing_authz::adapters::{
    InMemoryDunningEventRepository, InMemoryEntitlementCache, InMemoryEntitlementRepository,
    InMemoryPaymentRepository, InMemorySubscriptionRepository, RedisEntitlementCache,
    StubPaymentRetrier, TracingEventPublisher,
};
use billing_authz::application::{
    DunningManager, DunningScheduler, EntitlementEngine, SubscriptionLifecycleManager,
};
use billing_authz::config::{AppConfig, LoggingConfig, RedisConfig};
use billing_authz::ports::EntitlementCache;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.logging);

    let cache: Arc<dyn EntitlementCache> = match &config.redis {
        Some(redis) => connect_cache(redis).await,
        None => Arc::new(InMemoryEntitlementCache::new()),
    };

    let engine = Arc::new(EntitlementEngine::new(
        Arc::new(InMemoryEntitlementRepository::new()),
        cache,
        Arc::new(TracingEventPublisher::new("entitlement")),
        config.entitlements.clone(),
    ));
    let lifecycle = Arc::new(SubscriptionLifecycleManager::new(
        Arc::new(InMemorySubscriptionRepository::new()),
        engine,
        Arc::new(TracingEventPublisher::new("subscription")),
    ));
    let dunning = Arc::new(DunningManager::new(
        Arc::new(InMemoryDunningEventRepository::new()),
        Arc::new(InMemoryPaymentRepository::new()),
        lifecycle,
        Arc::new(TracingEventPublisher::new("dunning")),
        config.dunning.retry_policy(),
    ));
    let scheduler = DunningScheduler::new(
        dunning,
        Arc::new(StubPaymentRetrier::always_failing("no payment provider configured")),
        &config.dunning,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    info!("billing-authz started");
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    // Receiver may already be gone if the scheduler exited.
    let _ = shutdown_tx.send(true);
    scheduler_task.await?;
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect_cache(redis: &RedisConfig) -> Arc<dyn EntitlementCache> {
    let connected =
        RedisEntitlementCache::connect(&redis.url, redis.key_prefix.clone(), redis.timeout()).await;
    match connected {
        Ok(cache) => {
            info!("entitlement cache: redis");
            Arc::new(cache)
        }
        Err(err) => {
            warn!(error = %err, "redis unavailable, using in-memory entitlement cache");
            Arc::new(InMemoryEntitlementCache::new())
        }
    }
}
