// src/error.rs
use chrono::NaiveDate;
use thiserror::Error;

use crate::timesheet::TimesheetSide;

// --- Error Types ---

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimesheetError {
    #[error("Invalid {side} timesheet row {row}: field '{field}' {reason}")]
    Validation {
        side: TimesheetSide,
        row: usize, // Zero-based index into the input sequence
        field: String,
        reason: String,
    },

    #[error("Invalid parameter '{field}': {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("Duplicate entry in {side} timesheet for employee {employee_id} on {date}")]
    DuplicateKey {
        side: TimesheetSide,
        employee_id: String,
        date: NaiveDate,
    },

    #[error("Not enough data to score anomalies: {employees} employee(s) x {dates} weekday(s), need at least 2 x 1")]
    InsufficientData { employees: usize, dates: usize },

    #[error("Anomaly model could not be fit: {reason}")]
    ModelFit { reason: String },
}

impl TimesheetError {
    pub(crate) fn invalid_parameter(field: &str, reason: impl Into<String>) -> Self {
        TimesheetError::InvalidParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TimesheetError::Validation { .. } | TimesheetError::InvalidParameter { .. } => {
                "validation"
            }
            TimesheetError::DuplicateKey { .. } => "duplicate_key",
            TimesheetError::InsufficientData { .. } => "insufficient_data",
            TimesheetError::ModelFit { .. } => "model_fit",
        }
    }
}
