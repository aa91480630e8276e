//! Heartbeat and error reporting.
//!
//! Reporting is best effort: a sink never fails a sync cycle, it logs and moves on.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        LazyLock,
    },
    time::Duration,
};

use async_trait::async_trait;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

/// Timeout of a single push.
const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,3})\.\d{1,3}\.\d{1,3}\.(\d{1,3})\b").expect("pattern is valid")
});

/// Receives liveness pulses and coded error reports from the sync loops.
#[async_trait]
pub trait MetricsSink: Send + Sync + 'static {
    /// Signals a successful sync cycle.
    async fn heartbeat(&self);

    /// Reports a failed sync cycle.
    async fn report_error(&self, code: i32, message: &str);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl MetricsSink for NoopSink {
    async fn heartbeat(&self) {}

    async fn report_error(&self, _code: i32, _message: &str) {}
}

/// Errors setting up a [`PushGateway`].
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The HTTP client could not be built.
    #[error("could not build http client: {0}")]
    Client(#[from] reqwest::Error),

    /// The heartbeat collector could not be registered.
    #[error("could not register collector: {0}")]
    Registry(#[from] prometheus::Error),
}

/// Pushes metrics to a Prometheus push gateway.
///
/// Heartbeats push a `heartbeat` counter under `job`/`instance`. Errors are posted as a
/// `rtoken_rpc_error` sample grouped by error code, with IPv4 addresses masked out of the message.
#[derive(Debug)]
pub struct PushGateway {
    client: reqwest::Client,
    group_url: String,
    registry: Registry,
    heartbeat: IntCounter,
    errors_reported: AtomicU64,
}

impl PushGateway {
    /// Creates a sink pushing to `gateway` under `job` and `instance`.
    pub fn new(gateway: &str, job: &str, instance: &str) -> Result<Self, MetricsError> {
        let client = reqwest::Client::builder().timeout(PUSH_TIMEOUT).build()?;

        let registry = Registry::new();
        let heartbeat = IntCounter::new("heartbeat", "successful sync cycles")?;
        registry.register(Box::new(heartbeat.clone()))?;

        Ok(Self {
            client,
            group_url: group_url(gateway, job, instance),
            registry,
            heartbeat,
            errors_reported: AtomicU64::new(0),
        })
    }

    async fn post(&self, url: String, content_type: String, body: Vec<u8>) {
        let res = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        match res {
            Ok(_) => debug!(%url, "pushed metrics"),
            Err(err) => warn!(%url, %err, "could not push metrics"),
        }
    }
}

#[async_trait]
impl MetricsSink for PushGateway {
    async fn heartbeat(&self) {
        self.heartbeat.inc();

        let encoder = TextEncoder::new();
        let mut body = Vec::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut body) {
            warn!(%err, "could not encode heartbeat");
            return;
        }

        self.post(
            self.group_url.clone(),
            encoder.format_type().to_string(),
            body,
        )
        .await;
    }

    async fn report_error(&self, code: i32, message: &str) {
        let previous = self.errors_reported.fetch_add(1, Ordering::Relaxed);
        let url = format!("{}/code/{code}", self.group_url);

        self.post(
            url,
            "text/plain".to_string(),
            error_payload(message, previous).into_bytes(),
        )
        .await;
    }
}

fn group_url(gateway: &str, job: &str, instance: &str) -> String {
    format!(
        "{}/metrics/job/{job}/instance/{instance}",
        gateway.trim_end_matches('/')
    )
}

fn error_payload(message: &str, count: u64) -> String {
    let msg = escape_label_value(&mask_ipv4(message));
    format!("# TYPE rtoken_rpc_error counter\nrtoken_rpc_error{{msg=\"{msg}\"}} {count}\n")
}

/// Replaces the middle octets of every IPv4 address in `text` with `x`.
pub fn mask_ipv4(text: &str) -> String {
    IPV4.replace_all(text, "${1}.x.x.${2}").into_owned()
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('"', "\\\"")
        .replace('\n', r"\n")
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn addresses_are_masked() {
        let msg = "dial tcp 10.20.30.40:8545: connection refused by 192.168.0.1";
        assert_eq!(
            mask_ipv4(msg),
            "dial tcp 10.x.x.40:8545: connection refused by 192.x.x.1"
        );
        assert_eq!(mask_ipv4("era 12 not executed"), "era 12 not executed");
    }

    #[test]
    fn error_payload_is_exposition_text() {
        let payload = error_payload("bad \"rpc\" at 1.2.3.4", 7);
        assert_eq!(
            payload,
            "# TYPE rtoken_rpc_error counter\nrtoken_rpc_error{msg=\"bad \\\"rpc\\\" at 1.x.x.4\"} 7\n"
        );
    }

    #[test]
    fn group_url_ignores_trailing_slash() {
        assert_eq!(
            group_url("http://gw:9091/", "relay", "0xabc"),
            "http://gw:9091/metrics/job/relay/instance/0xabc"
        );
    }

    #[tokio::test]
    async fn unreachable_gateway_is_not_fatal() {
        let sink = PushGateway::new("http://127.0.0.1:9", "relay", "test").unwrap();
        sink.heartbeat().await;
        sink.report_error(3, "timeout").await;

        assert_eq!(sink.heartbeat.get(), 1);
        assert_eq!(sink.errors_reported.load(Ordering::Relaxed), 1);
    }

    proptest! {
        #[test]
        fn masking_keeps_outer_octets(a: u8, b: u8, c: u8, d: u8) {
            let masked = mask_ipv4(&format!("host {a}.{b}.{c}.{d} down"));
            prop_assert_eq!(masked, format!("host {a}.x.x.{d} down"));
        }
    }
}
