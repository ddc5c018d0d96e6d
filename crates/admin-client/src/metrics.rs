//! Client metrics
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! every call is a no-op.
//!
//! - `admin_client_requests_total` (counter): labels `status`, `attempt`
//! - `admin_client_request_duration_seconds` (histogram): label `status`
//! - `admin_client_refresh_total` (counter): label `outcome`
//! - `admin_client_replays_total` (counter)

use crate::request::Attempt;

/// Record one dispatched request and its final status.
pub fn record_response(status: u16, attempt: Attempt, duration_secs: f64) {
    let status = status.to_string();
    metrics::counter!(
        "admin_client_requests_total",
        "status" => status.clone(),
        "attempt" => attempt.label()
    )
    .increment(1);
    metrics::histogram!("admin_client_request_duration_seconds", "status" => status)
        .record(duration_secs);
}

/// Record a refresh endpoint call. `outcome` is `success` or `failure`.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("admin_client_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a replay after a successful refresh.
pub fn record_replay() {
    metrics::counter!("admin_client_replays_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_response(200, Attempt::Original, 0.01);
        record_refresh("success");
        record_replay();
    }

    #[test]
    fn record_response_carries_status_and_attempt_labels() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_response(401, Attempt::Original, 0.02);
        record_response(200, Attempt::Replay, 0.03);

        let output = handle.render();
        assert!(output.contains("admin_client_requests_total"));
        assert!(output.contains("status=\"401\""));
        assert!(output.contains("attempt=\"original\""));
        assert!(output.contains("attempt=\"replay\""));
        assert!(output.contains("admin_client_request_duration_seconds"));
    }

    #[test]
    fn refresh_and_replay_counters_render() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_refresh("success");
        record_refresh("failure");
        record_replay();

        let output = handle.render();
        assert!(output.contains("admin_client_refresh_total{outcome=\"success\"} 1"));
        assert!(output.contains("admin_client_refresh_total{outcome=\"failure\"} 1"));
        assert!(output.contains("admin_client_replays_total 1"));
    }
}
