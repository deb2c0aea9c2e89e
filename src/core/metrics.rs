use std::sync::OnceLock;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_http(method: &str, status: u16, elapsed: Duration) {
    let status = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(elapsed.as_secs_f64());
}

pub(crate) fn record_grading(outcome: &'static str, seconds: f64) {
    metrics::counter!("submission_gradings_total", "outcome" => outcome).increment(1);
    metrics::histogram!("submission_grading_duration_seconds", "outcome" => outcome)
        .record(seconds);
}

pub(crate) fn record_notification_failure(kind: &'static str) {
    metrics::counter!("notification_failures_total", "kind" => kind).increment(1);
}
