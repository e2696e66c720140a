//! Lift and cost-per-incremental-conversion.

use crate::metric::Metric;

/// `100 · (test − control) / control`; unbounded when the baseline is 0.
pub fn lift_percentage(test_conversion_rate: f64, control_conversion_rate: f64) -> Metric {
    if control_conversion_rate > 0.0 {
        Metric::Defined(
            100.0 * (test_conversion_rate - control_conversion_rate) / control_conversion_rate,
        )
    } else {
        Metric::INFINITY
    }
}

/// Test conversions beyond the control baseline. Negative is a valid outcome.
pub fn incremental_conversions(test_conversions: i64, control_conversions: i64) -> i64 {
    test_conversions - control_conversions
}

/// Total message spend divided by incremental conversions; unbounded when
/// the study produced no incremental conversions.
pub fn cost_per_incremental_conversion(
    average_message_cost: f64,
    messages_count: i64,
    incremental_conversions: i64,
) -> Metric {
    if incremental_conversions > 0 {
        Metric::Defined(
            average_message_cost * messages_count as f64 / incremental_conversions as f64,
        )
    } else {
        Metric::INFINITY
    }
}
