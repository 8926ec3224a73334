// src/lib.rs
//! Timesheet reconciliation and anomaly detection.
//!
//! Two independent, stateless operations over employee/date/hours tables:
//! [`reconcile`] joins a client timesheet against a company timesheet and
//! reports per-day hour discrepancies, and [`detect_anomalies`] flags
//! employees whose weekday hours pattern stands out from their peers.

pub mod anomaly;
pub mod config;
pub mod error;
pub mod isolation_forest;
pub mod matrix;
pub mod reconcile;
pub mod report;
pub mod server;
pub mod timesheet;

pub use anomaly::{
    detect_anomalies, detect_anomalies_in_records, AnomalyParams, AnomalyReport, AnomalyResult,
};
pub use error::TimesheetError;
pub use matrix::EmployeeDayMatrix;
pub use reconcile::{
    reconcile, reconcile_records, MatchedPair, Reconciliation, ReconciliationSummary,
    UnmatchedRecord,
};
pub use timesheet::{validate_timesheet, TimesheetRecord, TimesheetRow, TimesheetSide};
