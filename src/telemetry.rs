use anyhow::{Context, Result};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, Resource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

static OTLP_EXPORT_ENABLED: AtomicBool = AtomicBool::new(false);

/// Telemetry configuration structure
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    pub otlp_endpoint: Option<String>,
    pub enable_tracing: bool,
    pub export_timeout: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: std::env::var("DEPLOYMENT_ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|endpoint| !endpoint.trim().is_empty()),
            enable_tracing: std::env::var("OTEL_TRACES_ENABLED")
                .map(|v| v.parse().unwrap_or(true))
                .unwrap_or(true),
            export_timeout: Duration::from_secs(30),
        }
    }
}

/// Telemetry handles for graceful shutdown
pub struct TelemetryHandles {
    config: TelemetryConfig,
}

impl TelemetryHandles {
    /// Flush pending spans and shut the tracer provider down.
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down telemetry for {}", self.config.service_name);
        global::shutdown_tracer_provider();
        Ok(())
    }
}

/// Install the log subscriber and, when an OTLP endpoint is configured, the
/// span exporter.
pub async fn init_telemetry(config: Option<TelemetryConfig>) -> Result<TelemetryHandles> {
    let config = config.unwrap_or_default();

    setup_tracing_subscriber(&config)?;

    info!(
        "Initializing telemetry for service: {} v{} in environment: {}",
        config.service_name, config.service_version, config.environment
    );

    if config.enable_tracing {
        let resource = create_resource(&config);
        init_tracing(&config, &resource)?;
    }

    Ok(TelemetryHandles { config })
}

fn create_resource(config: &TelemetryConfig) -> Resource {
    Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", config.service_version.clone()),
        KeyValue::new("deployment.environment", config.environment.clone()),
    ])
}

fn init_tracing(config: &TelemetryConfig, resource: &Resource) -> Result<()> {
    let Some(endpoint) = &config.otlp_endpoint else {
        info!("No OTLP endpoint configured, using console-only tracing");
        return Ok(());
    };

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint)
                .with_timeout(config.export_timeout),
        )
        .with_trace_config(
            opentelemetry_sdk::trace::config()
                .with_resource(resource.clone())
                .with_sampler(opentelemetry_sdk::trace::Sampler::AlwaysOn),
        )
        .install_batch(runtime::Tokio)
        .context("Failed to initialize OTLP tracer")?;

    OTLP_EXPORT_ENABLED.store(true, Ordering::Relaxed);
    info!("Distributed tracing initialized with OTLP exporter at {}", endpoint);
    Ok(())
}

fn setup_tracing_subscriber(_config: &TelemetryConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{}=debug,tower_http=debug", env!("CARGO_CRATE_NAME")).into());

    Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

/// Reported by `/health`.
pub fn telemetry_health_check() -> HashMap<String, bool> {
    let mut health = HashMap::new();
    health.insert("log_subscriber".to_string(), true);
    health.insert("otlp_exporter".to_string(), OTLP_EXPORT_ENABLED.load(Ordering::Relaxed));
    health
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_reports_exporter_state() {
        let health = telemetry_health_check();
        assert_eq!(health.get("log_subscriber"), Some(&true));
        assert!(health.contains_key("otlp_exporter"));
    }
}
