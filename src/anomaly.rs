// src/anomaly.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TimesheetError;
use crate::isolation_forest::{outlier_mask, IsolationForest};
use crate::matrix::EmployeeDayMatrix;
use crate::timesheet::{validate_timesheet, TimesheetRecord, TimesheetRow, TimesheetSide};

pub const DEFAULT_CONTAMINATION: f64 = 0.1;
pub const DEFAULT_N_ESTIMATORS: usize = 100;
pub const DEFAULT_SEED: u64 = 42;

/// Tuning for one anomaly detection run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyParams {
    /// Expected share of anomalous employees, in [0, 1).
    pub contamination: f64,
    /// Number of isolation trees.
    pub n_estimators: usize,
    pub seed: u64,
}

impl Default for AnomalyParams {
    fn default() -> Self {
        Self {
            contamination: DEFAULT_CONTAMINATION,
            n_estimators: DEFAULT_N_ESTIMATORS,
            seed: DEFAULT_SEED,
        }
    }
}

impl AnomalyParams {
    fn validate(&self) -> Result<(), TimesheetError> {
        if !(0.0..1.0).contains(&self.contamination) {
            return Err(TimesheetError::invalid_parameter(
                "contamination",
                format!("must be in [0, 1) (got {})", self.contamination),
            ));
        }
        if self.n_estimators == 0 {
            return Err(TimesheetError::invalid_parameter(
                "n_estimators",
                "must be a positive integer",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub employee_id: String,
    /// Weekday hours in `AnomalyReport::dates` order.
    pub day_vector: Vec<Decimal>,
    pub score: f64,
    pub is_anomalous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub dates: Vec<NaiveDate>,
    pub results: Vec<AnomalyResult>,
    pub excluded_weekend_records: usize,
}

impl AnomalyReport {
    pub fn anomalies(&self) -> impl Iterator<Item = &AnomalyResult> {
        self.results.iter().filter(|result| result.is_anomalous)
    }
}

/// Validates a raw timesheet and flags employees with unusual weekday patterns.
pub fn detect_anomalies(
    timesheet: &[TimesheetRow],
    params: &AnomalyParams,
) -> Result<AnomalyReport, TimesheetError> {
    let records = validate_timesheet(timesheet, TimesheetSide::Timesheet)?;
    detect_anomalies_in_records(&records, params)
}

pub fn detect_anomalies_in_records(
    records: &[TimesheetRecord],
    params: &AnomalyParams,
) -> Result<AnomalyReport, TimesheetError> {
    params.validate()?;

    let matrix = EmployeeDayMatrix::from_records(records)?;
    let (employees, dates) = matrix.dimensions();
    if employees < 2 || dates < 1 {
        return Err(TimesheetError::InsufficientData { employees, dates });
    }

    let features = matrix.feature_rows();
    let forest = IsolationForest::fit(&features, params.n_estimators, params.seed)?;
    let scores = forest.score_samples(&features)?;
    let flags = outlier_mask(&scores, params.contamination);

    let results: Vec<AnomalyResult> = matrix
        .employees()
        .iter()
        .enumerate()
        .map(|(row, employee_id)| AnomalyResult {
            employee_id: employee_id.clone(),
            day_vector: matrix.day_vector(row).to_vec(),
            score: scores[row],
            is_anomalous: flags[row],
        })
        .collect();

    info!(
        "Scored {} employees over {} weekdays: anomalous={}, contamination={}, trees={}, seed={}",
        employees,
        dates,
        results.iter().filter(|result| result.is_anomalous).count(),
        params.contamination,
        params.n_estimators,
        params.seed
    );

    Ok(AnomalyReport {
        dates: matrix.dates().to_vec(),
        results,
        excluded_weekend_records: matrix.excluded_weekend_records(),
    })
}
