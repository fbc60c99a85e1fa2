//! Prometheus metrics exposition
//!
//! - `roadmap_generations_total` (counter): labels `kind`, `outcome`
//! - `roadmap_generation_duration_seconds` (histogram): label `kind`
//! - `roadmap_dispatch_errors_total` (counter): label `error_type`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering.
///
/// `roadmap_generation_duration_seconds` gets explicit buckets so it
/// renders as a histogram with `_bucket` lines rather than the default
/// summary. Skeleton calls finish in seconds; full course expansion can
/// run for minutes across batches, hence the wide upper range.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "roadmap_generation_duration_seconds".to_string(),
            ),
            &[
                0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0,
            ],
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a completed generation with its kind (`skeleton` or `course`)
/// and outcome (`ok` or `error`).
pub fn record_generation(kind: &str, outcome: &str, duration_secs: f64) {
    metrics::counter!("roadmap_generations_total", "kind" => kind.to_string(), "outcome" => outcome.to_string())
        .increment(1);
    metrics::histogram!("roadmap_generation_duration_seconds", "kind" => kind.to_string())
        .record(duration_secs);
}

/// Record a dispatch-level error with a classification label.
pub fn record_dispatch_error(error_type: &str) {
    metrics::counter!("roadmap_dispatch_errors_total", "error_type" => error_type.to_string())
        .increment(1);
}

/// Classify a generation error into a stable `error_type` label.
pub fn dispatch_error_type(e: &roadmap::Error) -> &'static str {
    match e {
        roadmap::Error::Exhausted(_) => "exhausted",
        roadmap::Error::Generation(gemini::Error::Timeout(_)) => "timeout",
        roadmap::Error::Generation(gemini::Error::Status { .. }) => "status",
        roadmap::Error::Generation(gemini::Error::Http(_)) => "network",
        roadmap::Error::Generation(_) => "payload",
        roadmap::Error::SkeletonParse(_) => "parse",
        roadmap::Error::Internal(_) => "internal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        // When no recorder is installed, metrics calls are no-ops.
        record_generation("skeleton", "ok", 2.1);
        record_dispatch_error("exhausted");
    }

    /// Create an isolated recorder/handle pair for unit tests.
    /// build_recorder() avoids the global recorder singleton constraint.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Full(
                    "roadmap_generation_duration_seconds".to_string(),
                ),
                &[0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0],
            )
            .expect("failed to set histogram buckets")
            .build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_generation_renders_counter_and_histogram() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_generation("skeleton", "ok", 1.2);
        record_generation("course", "error", 45.0);

        let output = handle.render();
        assert!(output.contains("roadmap_generations_total"));
        assert!(output.contains("kind=\"skeleton\""));
        assert!(output.contains("outcome=\"error\""));
        assert!(
            output.contains("roadmap_generation_duration_seconds_bucket"),
            "histogram must render _bucket lines"
        );
    }

    #[test]
    fn dispatch_error_types_cover_every_failure_shape() {
        use std::time::Duration;

        assert_eq!(dispatch_error_type(&roadmap::Error::Exhausted(10)), "exhausted");
        assert_eq!(
            dispatch_error_type(&roadmap::Error::Generation(gemini::Error::Timeout(
                Duration::from_secs(45)
            ))),
            "timeout"
        );
        assert_eq!(
            dispatch_error_type(&roadmap::Error::Generation(gemini::Error::Status {
                status: 429,
                body: "quota".into()
            })),
            "status"
        );
        assert_eq!(
            dispatch_error_type(&roadmap::Error::Generation(gemini::Error::EmptyResponse)),
            "payload"
        );
        assert_eq!(
            dispatch_error_type(&roadmap::Error::SkeletonParse("bad json".into())),
            "parse"
        );
        assert_eq!(
            dispatch_error_type(&roadmap::Error::Internal("oops".into())),
            "internal"
        );
    }

    #[test]
    fn record_dispatch_error_carries_error_type_label() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_dispatch_error("exhausted");
        record_dispatch_error("timeout");

        let output = handle.render();
        assert!(output.contains("roadmap_dispatch_errors_total"));
        assert!(output.contains("error_type=\"exhausted\""));
        assert!(output.contains("error_type=\"timeout\""));
    }
}
