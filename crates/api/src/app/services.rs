//! Collaborator wiring.
//!
//! Production wiring uses Postgres for origins and events, plus Redis for
//! notifications when `REDIS_URL` is set. The in-memory wiring backs tests
//! and local development with the same service graph.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use originstream_auth::{
    hash_credential, AccessGate, OriginRegistry, OriginSource, ReloadConfig, ReloadHandle,
};
use originstream_infra::event_store::{EventStore, PostgresEventStore};
use originstream_infra::notification::NotificationPublisher;
use originstream_infra::origin_store::PostgresOriginSource;
use originstream_infra::EventStream;
use originstream_notify::NotificationBus;

use crate::config::{AppConfig, StreamSettings};
use crate::context::AppContext;

/// Upper bound for one full origin load.
const ORIGIN_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Running services: the shared request context plus the background
/// origin refresh loop.
#[derive(Debug)]
pub struct AppServices {
    pub context: Arc<AppContext>,
    reload: ReloadHandle,
}

impl AppServices {
    /// Stop background work.
    pub async fn shutdown(self) {
        self.reload.shutdown().await;
    }
}

/// Production wiring.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let settings = &config.stream;

    let connect_options: PgConnectOptions = config
        .database_url
        .parse()
        .context("DATABASE_URL is not a valid Postgres url")?;
    // Appends are not cancelled client-side; bound them on the server.
    let statement_timeout = settings.store_timeout.as_millis().to_string();
    let connect_options = connect_options.options([("statement_timeout", statement_timeout.as_str())]);

    let pool = PgPoolOptions::new()
        .acquire_timeout(settings.store_timeout)
        .connect_with(connect_options)
        .await
        .context("failed to connect to Postgres")?;

    let events = PostgresEventStore::new(pool.clone());
    events.ensure_schema().await?;
    let origins = PostgresOriginSource::new(pool);
    origins.ensure_schema().await?;

    let bus = match &config.redis_url {
        Some(url) => Some(redis_bus(url, settings.publish_timeout)?),
        None => {
            tracing::warn!("REDIS_URL not set; event notifications disabled");
            None
        }
    };

    Ok(wire(settings, Arc::new(origins), Arc::new(events), bus).await)
}

#[cfg(feature = "redis")]
fn redis_bus(url: &str, timeout: Duration) -> anyhow::Result<Arc<dyn NotificationBus>> {
    let bus = originstream_infra::notification::RedisNotificationBus::new(url, timeout)
        .context("invalid REDIS_URL")?;
    Ok(Arc::new(bus))
}

#[cfg(not(feature = "redis"))]
fn redis_bus(_url: &str, _timeout: Duration) -> anyhow::Result<Arc<dyn NotificationBus>> {
    anyhow::bail!("REDIS_URL is set but this build has no redis support")
}

/// Wiring over caller-supplied collaborators (tests, local development).
pub async fn build_in_memory_services(
    settings: &StreamSettings,
    origins: Arc<dyn OriginSource>,
    events: Arc<dyn EventStore>,
    bus: Option<Arc<dyn NotificationBus>>,
) -> AppServices {
    wire(settings, origins, events, bus).await
}

async fn wire(
    settings: &StreamSettings,
    origins: Arc<dyn OriginSource>,
    events: Arc<dyn EventStore>,
    bus: Option<Arc<dyn NotificationBus>>,
) -> AppServices {
    let registry = Arc::new(OriginRegistry::new());

    // Load once before serving so the first requests see every origin. On
    // failure the loop retries right away with backoff.
    let first_reload_after = match registry.reload(origins.as_ref(), ORIGIN_LOAD_TIMEOUT).await {
        Ok(_) => settings.origin_refresh,
        Err(e) => {
            tracing::error!(error = %e, "initial origin load failed; serving with no origins");
            Duration::ZERO
        }
    };
    let reload = registry.spawn_reload_loop(
        origins,
        ReloadConfig {
            interval: settings.origin_refresh,
            load_timeout: ORIGIN_LOAD_TIMEOUT.min(settings.origin_refresh),
            first_reload_after,
            ..Default::default()
        },
    );

    let gate = AccessGate::new(registry, settings.max_requests_per_window);

    let mut stream = EventStream::new(events, settings.stream_id.clone())
        .with_store_timeout(settings.store_timeout);
    if let Some(bus) = bus {
        stream = stream.with_publisher(NotificationPublisher::new(
            bus,
            settings.stream_id.clone(),
            settings.publish_timeout,
        ));
    }

    if settings.api_pass.is_none() {
        tracing::warn!("API_PASS not set; admin probes disabled");
    }
    let admin_pass_hash = settings.api_pass.as_deref().map(hash_credential);

    tracing::info!(
        stream_id = %settings.stream_id,
        max_requests_per_window = settings.max_requests_per_window,
        origin_refresh = ?settings.origin_refresh,
        "event stream services ready"
    );

    AppServices {
        context: Arc::new(AppContext::new(gate, Arc::new(stream), admin_pass_hash)),
        reload,
    }
}
