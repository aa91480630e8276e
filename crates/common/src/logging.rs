//! Initializes `tracing` output for the relay: a compact stdout layer and, when a collector is
//! configured, OpenTelemetry span export over OTLP.

use std::env;

use opentelemetry::{trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use thiserror::Error;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding the OTLP collector endpoint.
pub const OTLP_URL_ENVVAR: &str = "STAKE_RELAY_OTLP_URL";

/// Environment variable holding a label appended to the whoami string.
///
/// Useful when several relays share one log sink.
pub const SVC_LABEL_ENVVAR: &str = "STAKE_RELAY_SVC_LABEL";

/// Set to `1` to print the source file of each event.
const LOG_FILE_ENVVAR: &str = "LOG_FILE";

/// Set to `1` to print the source line of each event.
const LOG_LINE_NUM_ENVVAR: &str = "LOG_LINE_NUM";

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The OTLP span exporter could not be built.
    #[error("could not build otlp exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),

    /// A global subscriber is already installed.
    #[error("could not install subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Configuration for the logger.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Identifies this process in logs and as the OpenTelemetry service name.
    whoami: String,

    /// Level used when `RUST_LOG` is unset.
    default_level: LevelFilter,

    /// The OTLP collector endpoint, if spans should be exported.
    otel_url: Option<String>,
}

impl LoggerConfig {
    /// Creates a config identified by `whoami`, logging at `INFO` unless `RUST_LOG` says otherwise.
    pub const fn new(whoami: String) -> Self {
        Self {
            whoami,
            default_level: LevelFilter::INFO,
            otel_url: None,
        }
    }

    /// Creates a config whose whoami string is `base`, suffixed with the service label if set.
    pub fn with_base_name(base: &str) -> Self {
        Self::new(get_whoami_string(base))
    }

    /// Exports spans to the collector named by [`OTLP_URL_ENVVAR`], if set.
    pub fn with_otlp_from_env(mut self) -> Self {
        self.otel_url = get_otlp_url_from_env();
        self
    }

    /// Sets the OTLP collector endpoint.
    pub fn set_otlp_url(&mut self, url: String) {
        self.otel_url = Some(url);
    }

    /// Sets the level used when `RUST_LOG` is unset.
    pub fn set_default_level(&mut self, level: LevelFilter) {
        self.default_level = level;
    }

    /// The whoami string.
    pub fn whoami(&self) -> &str {
        &self.whoami
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::with_base_name("(stake-relay)")
    }
}

/// Installs the global subscriber described by `config`.
pub fn init(config: LoggerConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.default_level.into())
        .from_env_lossy();

    let stdout = tracing_subscriber::fmt::layer()
        .compact()
        .event_format(
            tracing_subscriber::fmt::format()
                .with_file(env_flag(LOG_FILE_ENVVAR))
                .with_line_number(env_flag(LOG_LINE_NUM_ENVVAR)),
        )
        .with_filter(filter);

    match &config.otel_url {
        Some(otel_url) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(otel_url)
                .build()?;

            let resource = Resource::builder()
                .with_attribute(KeyValue::new("service.name", config.whoami.clone()))
                .build();

            let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                .with_resource(resource)
                .with_batch_exporter(exporter)
                .build();

            let otel = tracing_opentelemetry::layer().with_tracer(provider.tracer("stake-relay"));

            tracing_subscriber::registry()
                .with(stdout)
                .with(otel)
                .try_init()?;
        }
        None => tracing_subscriber::registry().with(stdout).try_init()?,
    }

    info!(whoami = %config.whoami, otlp = config.otel_url.is_some(), "logging started");
    Ok(())
}

/// Installs a stdout subscriber writing through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The OTLP collector endpoint from [`OTLP_URL_ENVVAR`].
pub fn get_otlp_url_from_env() -> Option<String> {
    env::var(OTLP_URL_ENVVAR).ok()
}

/// The service label from [`SVC_LABEL_ENVVAR`].
pub fn get_service_label_from_env() -> Option<String> {
    env::var(SVC_LABEL_ENVVAR).ok()
}

/// Builds the whoami string for `base`.
pub fn get_whoami_string(base: &str) -> String {
    match get_service_label_from_env() {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).is_ok_and(|v| v == "1")
}
