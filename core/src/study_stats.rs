//! Composes the per-arm metrics, the significance test and lift.

use crate::{
    conversion_filter::ValidConversions,
    error::LiftResult,
    group_metrics::{group_result, GroupResult},
    lift::lift_percentage,
    metric::Metric,
    significance::p_value,
    types::GroupName,
};

#[derive(Debug, Clone, PartialEq)]
pub struct StudyStats {
    pub control: GroupResult,
    pub test: GroupResult,
    pub lift: Metric,
    pub p_value: Metric,
}

pub fn study_stats(
    valid_conversions: &ValidConversions,
    control_group_size: i64,
    test_group_size: i64,
    alpha: f64,
) -> LiftResult<StudyStats> {
    let control = group_result(valid_conversions, GroupName::Control, control_group_size, alpha)?;
    let test = group_result(valid_conversions, GroupName::Test, test_group_size, alpha)?;

    let p_value = p_value(
        control.conversions,
        control_group_size,
        test.conversions,
        test_group_size,
    )?;
    let lift = lift_percentage(test.conversion_rate, control.conversion_rate);

    Ok(StudyStats {
        control,
        test,
        lift,
        p_value,
    })
}
