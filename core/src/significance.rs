//! Significance of the control/test difference: chi-squared test of
//! independence on the 2×2 conversion table, with Yates' correction.

use crate::{
    error::{LiftError, LiftResult},
    metric::Metric,
    normal::chi2_sf_1dof,
};

/// `[[control converted, control not converted], [test converted, test not converted]]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContingencyTable {
    pub cells: [[f64; 2]; 2],
}

impl ContingencyTable {
    pub fn from_counts(
        control_conversions: i64,
        control_size: i64,
        test_conversions: i64,
        test_size: i64,
    ) -> LiftResult<Self> {
        let cells = [
            [control_conversions, control_size - control_conversions],
            [test_conversions, test_size - test_conversions],
        ];
        if cells.iter().flatten().any(|&c| c < 0) {
            return Err(LiftError::Data(format!(
                "Invalid contingency table {cells:?}: conversions exceed group size."
            )));
        }
        Ok(Self {
            cells: cells.map(|row| row.map(|c| c as f64)),
        })
    }

    /// Expected counts under independence; `None` if any expected cell is 0.
    pub fn expected(&self) -> Option<[[f64; 2]; 2]> {
        let row = [self.cells[0][0] + self.cells[0][1], self.cells[1][0] + self.cells[1][1]];
        let col = [self.cells[0][0] + self.cells[1][0], self.cells[0][1] + self.cells[1][1]];
        let total = row[0] + row[1];
        if total <= 0.0 {
            return None;
        }
        let expected = [
            [row[0] * col[0] / total, row[0] * col[1] / total],
            [row[1] * col[0] / total, row[1] * col[1] / total],
        ];
        if expected.iter().flatten().any(|&e| e <= 0.0) {
            return None;
        }
        Some(expected)
    }

    /// Yates-corrected chi-squared statistic: each observed cell moves
    /// toward its expected value by at most 0.5 before squaring.
    pub fn chi_squared_yates(&self) -> Option<f64> {
        let expected = self.expected()?;
        let mut stat = 0.0;
        for (obs_row, exp_row) in self.cells.iter().zip(expected.iter()) {
            for (&obs, &exp) in obs_row.iter().zip(exp_row.iter()) {
                let diff = exp - obs;
                let corrected = obs + diff.signum() * diff.abs().min(0.5);
                stat += (corrected - exp).powi(2) / exp;
            }
        }
        Some(stat)
    }
}

/// P-value for "conversion is independent of arm".
///
/// Undefined (never an error) when both arms fully converted or neither
/// arm converted at all.
pub fn p_value(
    control_conversions: i64,
    control_size: i64,
    test_conversions: i64,
    test_size: i64,
) -> LiftResult<Metric> {
    let control_not_converted = control_size - control_conversions;
    let test_not_converted = test_size - test_conversions;

    if (control_not_converted == 0 && test_not_converted == 0)
        || (control_conversions == 0 && test_conversions == 0)
    {
        log::warn!("p-value undefined: contingency table has a constant column");
        return Ok(Metric::NAN);
    }

    let table =
        ContingencyTable::from_counts(control_conversions, control_size, test_conversions, test_size)?;
    match table.chi_squared_yates() {
        Some(stat) => {
            log::debug!("chi2={stat:.6} on {:?}", table.cells);
            Ok(Metric::Defined(chi2_sf_1dof(stat)))
        }
        None => {
            log::warn!("p-value undefined: zero expected frequency in {:?}", table.cells);
            Ok(Metric::NAN)
        }
    }
}
