// src/timesheet.rs
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::error::TimesheetError;

// --- Constants ---

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
// Spreadsheet exports often carry midnight timestamps in the date column
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub(crate) type JoinKey = (String, NaiveDate);

/// Which input a record or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimesheetSide {
    Client,
    Company,
    /// The single timesheet handed to the anomaly detector.
    Timesheet,
}

impl fmt::Display for TimesheetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimesheetSide::Client => "client",
            TimesheetSide::Company => "company",
            TimesheetSide::Timesheet => "input",
        };
        f.write_str(name)
    }
}

// --- Core Data Structures ---

/// A timesheet row as it arrives from a file or request body.
///
/// Every field is optional here; `validate_timesheet` turns rows into
/// `TimesheetRecord`s or reports the first offending field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimesheetRow {
    #[serde(default, alias = "Employee ID", alias = "employee")]
    pub employee_id: Option<String>,
    #[serde(default, alias = "Date")]
    pub date: Option<String>,
    #[serde(default, alias = "Hours Worked", alias = "hours")]
    pub hours_worked: Option<Decimal>,
}

impl TimesheetRow {
    pub fn new(employee_id: &str, date: &str, hours_worked: Decimal) -> Self {
        Self {
            employee_id: Some(employee_id.to_string()),
            date: Some(date.to_string()),
            hours_worked: Some(hours_worked),
        }
    }
}

/// A validated timesheet entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimesheetRecord {
    pub employee_id: String,
    pub date: NaiveDate,
    pub hours_worked: Decimal,
}

impl TimesheetRecord {
    pub fn new(employee_id: &str, date: NaiveDate, hours_worked: Decimal) -> Self {
        Self {
            employee_id: employee_id.to_string(),
            date,
            hours_worked,
        }
    }

    pub(crate) fn key(&self) -> JoinKey {
        (self.employee_id.clone(), self.date)
    }
}

// --- Validation ---

/// Parses a date cell into a calendar date, dropping any time-of-day part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|date_time| date_time.date())
        })
}

fn validate_row(
    row: &TimesheetRow,
    side: TimesheetSide,
    index: usize,
) -> Result<TimesheetRecord, TimesheetError> {
    let invalid = |field: &str, reason: String| TimesheetError::Validation {
        side,
        row: index,
        field: field.to_string(),
        reason,
    };

    let employee_id = row
        .employee_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| invalid("employee_id", "is missing".to_string()))?;

    let raw_date = row
        .date
        .as_deref()
        .filter(|date| !date.trim().is_empty())
        .ok_or_else(|| invalid("date", "is missing".to_string()))?;
    let date = parse_date(raw_date)
        .ok_or_else(|| invalid("date", format!("could not be parsed from '{}'", raw_date)))?;

    let hours_worked = row
        .hours_worked
        .ok_or_else(|| invalid("hours_worked", "is missing".to_string()))?;
    if hours_worked < Decimal::ZERO {
        return Err(invalid(
            "hours_worked",
            format!("must not be negative (got {})", hours_worked),
        ));
    }

    Ok(TimesheetRecord {
        employee_id: employee_id.to_string(),
        date,
        hours_worked,
    })
}

/// Validates every row of one timesheet in a single pass.
///
/// Fails on the first malformed row; no partial result is returned.
pub fn validate_timesheet(
    rows: &[TimesheetRow],
    side: TimesheetSide,
) -> Result<Vec<TimesheetRecord>, TimesheetError> {
    let records = rows
        .iter()
        .enumerate()
        .map(|(index, row)| validate_row(row, side, index))
        .collect::<Result<Vec<_>, _>>()?;
    debug!("Validated {} {} timesheet rows", records.len(), side);
    Ok(records)
}

/// Indexes records by (employee_id, date), rejecting duplicate keys.
pub(crate) fn index_by_key(
    records: &[TimesheetRecord],
    side: TimesheetSide,
) -> Result<BTreeMap<JoinKey, &TimesheetRecord>, TimesheetError> {
    let mut index = BTreeMap::new();
    for record in records {
        if index.insert(record.key(), record).is_some() {
            return Err(TimesheetError::DuplicateKey {
                side,
                employee_id: record.employee_id.clone(),
                date: record.date,
            });
        }
    }
    Ok(index)
}
