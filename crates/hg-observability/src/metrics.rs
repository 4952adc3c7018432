//! Metric names and descriptions.
//!
//! Counters are recorded through the `metrics` facade. Without an installed
//! recorder they are no-ops.

use metrics::describe_counter;

/// Adapter invocations, labelled by `adapter` and `outcome`.
pub const ADAPTER_ATTEMPTS_TOTAL: &str = "hostgate_adapter_attempts_total";
/// Final verdicts, labelled by `verdict`.
pub const VERDICTS_TOTAL: &str = "hostgate_verdicts_total";
/// Snapshot rebuilds from the flat-file source.
pub const CACHE_REBUILDS_TOTAL: &str = "hostgate_cache_rebuilds_total";
/// Lookups served from a fresh snapshot.
pub const CACHE_HITS_TOTAL: &str = "hostgate_cache_hits_total";

/// Registers metric descriptions with the installed recorder.
pub fn register_metrics() {
    describe_counter!(
        ADAPTER_ATTEMPTS_TOTAL,
        "Inventory source lookups by adapter and outcome"
    );
    describe_counter!(VERDICTS_TOTAL, "Authorization verdicts by outcome");
    describe_counter!(
        CACHE_REBUILDS_TOTAL,
        "Inventory snapshot rebuilds from the flat file"
    );
    describe_counter!(
        CACHE_HITS_TOTAL,
        "Flat-file lookups served from a fresh snapshot"
    );
}
