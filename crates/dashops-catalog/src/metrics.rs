//! Catalog metrics.
//!
//! Provides metrics for catalog mutations, history recording, and health
//! aggregation. These complement the structured logging already in place.

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Catalog mutation counter, labeled by action and outcome.
pub const CATALOG_MUTATIONS: &str = "dashops_catalog_mutations_total";

/// Best-effort versioning failures on the write path.
pub const VERSIONING_FAILURES: &str = "dashops_versioning_failures_total";

/// Health aggregation counter, labeled by resulting overall status.
pub const HEALTH_AGGREGATIONS: &str = "dashops_health_aggregations_total";

/// Health aggregation duration histogram.
pub const HEALTH_AGGREGATION_DURATION: &str = "dashops_health_aggregation_duration_seconds";

/// Registers all catalog metric descriptions.
///
/// Call once at application startup after installing the metrics recorder.
pub fn register_metrics() {
    describe_counter!(CATALOG_MUTATIONS, "Total catalog mutations");
    describe_counter!(
        VERSIONING_FAILURES,
        "Total best-effort history recording failures"
    );
    describe_counter!(HEALTH_AGGREGATIONS, "Total service health aggregations");
    describe_histogram!(
        HEALTH_AGGREGATION_DURATION,
        "Duration of service health aggregations in seconds"
    );
}

/// Records a catalog mutation.
pub fn record_mutation(action: &str, outcome: &str) {
    counter!(
        CATALOG_MUTATIONS,
        "action" => action.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);
}

/// Records a versioning failure swallowed on the write path.
pub fn record_versioning_failure(action: &str) {
    counter!(VERSIONING_FAILURES, "action" => action.to_string()).increment(1);
}

/// Records a completed health aggregation.
pub fn record_health_aggregation(status: &str, duration_secs: f64) {
    counter!(HEALTH_AGGREGATIONS, "status" => status.to_string()).increment(1);
    histogram!(HEALTH_AGGREGATION_DURATION).record(duration_secs);
}
