//! Per-arm conversion metrics: count, rate and a Wald confidence interval.

use crate::{
    conversion_filter::ValidConversions,
    error::{LiftError, LiftResult},
    normal::normal_isf,
    types::GroupName,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupResult {
    pub group: GroupName,
    pub conversions: i64,
    pub group_size: i64,
    pub conversion_rate: f64,
    /// `(low, high)`, both clamped to `[0, 1]`.
    pub confidence_interval: (f64, f64),
}

/// `conversions / group_size`, or 0 for an empty arm.
pub fn conversion_rate(conversions: i64, group_size: i64) -> f64 {
    if group_size > 0 {
        conversions as f64 / group_size as f64
    } else {
        0.0
    }
}

/// Two-sided normal-approximation (Wald) interval for a binomial proportion:
/// `p ± z·sqrt(p(1-p)/n)` with `z = isf(alpha / 2)`, clamped to `[0, 1]`.
///
/// `nobs == 0` leaves the proportion undefined and fails with
/// `DivisionByZero` instead of producing NaN bounds.
pub fn confidence_interval(count: i64, nobs: i64, alpha: f64) -> LiftResult<(f64, f64)> {
    if nobs == 0 {
        return Err(LiftError::DivisionByZero {
            what: "confidence interval of an empty group",
        });
    }
    let n = nobs as f64;
    let prop = count as f64 / n;
    let std = (prop * (1.0 - prop) / n).sqrt();
    let dist = normal_isf(alpha / 2.0) * std;

    let low = (prop - dist).clamp(0.0, 1.0);
    let high = (prop + dist).clamp(0.0, 1.0);
    Ok((low, high))
}

/// Metrics for one arm of the study.
pub fn group_result(
    valid_conversions: &ValidConversions,
    group: GroupName,
    group_size: i64,
    alpha: f64,
) -> LiftResult<GroupResult> {
    let conversions = valid_conversions.count_for(group);
    let conversion_rate = conversion_rate(conversions, group_size);
    let confidence_interval = confidence_interval(conversions, group_size, alpha)?;

    log::debug!(
        "{group}: {conversions}/{group_size} converted, rate={conversion_rate:.4}, \
         ci=[{:.4}, {:.4}]",
        confidence_interval.0,
        confidence_interval.1
    );

    Ok(GroupResult {
        group,
        conversions,
        group_size,
        conversion_rate,
        confidence_interval,
    })
}
