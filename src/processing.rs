use crate::types::{AggregatedMetrics, MetricKind, Series};
use tracing::debug;

// Name used for frames the host delivers without one
const UNNAMED_SERIES: &str = "_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified<'a> {
    pub kind: MetricKind,
    pub name: &'a str,
}

/// Splits a series name into its bucket and location name.
///
/// `_Shop` is a net value, `0_Shop` a quantity, anything else visitors.
pub fn classify(series_name: &str) -> Classified<'_> {
    if let Some(name) = series_name.strip_prefix('_') {
        Classified { kind: MetricKind::NetValue, name }
    } else if let Some(name) = series_name.strip_prefix("0_") {
        Classified { kind: MetricKind::Quantity, name }
    } else {
        Classified { kind: MetricKind::Visitors, name: series_name }
    }
}

/// Half-up rounding to `decimals` places.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}

fn round_for(kind: MetricKind, value: f64) -> f64 {
    match kind {
        MetricKind::NetValue => round_to(value, 2),
        MetricKind::Quantity => round_to(value, 1),
        MetricKind::Visitors => round_to(value, 0),
    }
}

/// Sums every series into its bucket. Later duplicates overwrite earlier ones.
pub fn aggregate(series: &[Series]) -> AggregatedMetrics {
    let mut metrics = AggregatedMetrics::default();

    for s in series {
        let sum: f64 = s.values.iter().sum();
        let raw_name = s.name.as_deref().unwrap_or(UNNAMED_SERIES);
        let Classified { kind, name } = classify(raw_name);

        metrics
            .bucket_mut(kind)
            .insert(name.to_string(), round_for(kind, sum));
    }

    debug!(
        "Aggregated {} series: {} net, {} quantity, {} visitors",
        series.len(),
        metrics.net_value.len(),
        metrics.quantity.len(),
        metrics.visitors.len()
    );

    metrics
}
