use std::fmt::Write as _;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct Metrics {
    // Dispatch
    pub dispatches_total: AtomicU64,
    pub dispatch_micros_total: AtomicU64,

    // Failures
    pub transport_errors_total: AtomicU64,
    pub cardinality_errors_total: AtomicU64,
    pub caller_errors_total: AtomicU64,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::default)
}

pub(crate) fn record_dispatch(elapsed: Duration) {
    let m = metrics();
    m.dispatches_total.fetch_add(1, Ordering::Relaxed);
    m.dispatch_micros_total.fetch_add(
        u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
        Ordering::Relaxed,
    );
}

pub(crate) fn record_transport_error() {
    metrics()
        .transport_errors_total
        .fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_cardinality_error() {
    metrics()
        .cardinality_errors_total
        .fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_caller_error() {
    metrics().caller_errors_total.fetch_add(1, Ordering::Relaxed);
}

pub fn render_prometheus() -> String {
    let m = metrics();
    let mut s = String::new();
    // dispatch
    let _ = writeln!(
        s,
        "# TYPE rillquery_dispatches_total counter\nrillquery_dispatches_total {}",
        m.dispatches_total.load(Ordering::Relaxed)
    );
    let _ = writeln!(
        s,
        "# TYPE rillquery_dispatch_seconds_total counter\nrillquery_dispatch_seconds_total {:.6}",
        m.dispatch_micros_total.load(Ordering::Relaxed) as f64 / 1_000_000.0
    );
    // failures
    let _ = writeln!(
        s,
        "# TYPE rillquery_transport_errors_total counter\nrillquery_transport_errors_total {}",
        m.transport_errors_total.load(Ordering::Relaxed)
    );
    let _ = writeln!(
        s,
        "# TYPE rillquery_cardinality_errors_total counter\nrillquery_cardinality_errors_total {}",
        m.cardinality_errors_total.load(Ordering::Relaxed)
    );
    let _ = writeln!(
        s,
        "# TYPE rillquery_caller_errors_total counter\nrillquery_caller_errors_total {}",
        m.caller_errors_total.load(Ordering::Relaxed)
    );
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_lists_every_counter() {
        record_dispatch(Duration::from_millis(2));
        let text = render_prometheus();
        assert!(text.contains("rillquery_dispatches_total"));
        assert!(text.contains("rillquery_transport_errors_total"));
        assert!(text.contains("rillquery_cardinality_errors_total"));
        assert!(text.contains("rillquery_caller_errors_total"));
        assert!(metrics().dispatches_total.load(Ordering::Relaxed) >= 1);
    }
}
