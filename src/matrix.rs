// src/matrix.rs
use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::TimesheetError;
use crate::timesheet::{index_by_key, TimesheetRecord, TimesheetSide};

/// Mon-Fri, i.e. weekday index 0-4 counted from Monday.
pub fn is_weekday(date: NaiveDate) -> bool {
    date.weekday().num_days_from_monday() < 5
}

/// Employees as rows, weekdays as columns, hours in the cells.
///
/// Rows and columns are both sorted; a missing (employee, date) cell is 0.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeDayMatrix {
    employees: Vec<String>,
    dates: Vec<NaiveDate>,
    hours: Vec<Vec<Decimal>>,
    excluded_weekend_records: usize,
}

impl EmployeeDayMatrix {
    /// Pivots validated records into a matrix, dropping weekend entries.
    ///
    /// Duplicate (employee_id, date) keys are rejected across the whole input,
    /// weekend dates included.
    pub fn from_records(records: &[TimesheetRecord]) -> Result<Self, TimesheetError> {
        let index = index_by_key(records, TimesheetSide::Timesheet)?;

        let (weekday_records, weekend_records): (Vec<TimesheetRecord>, Vec<TimesheetRecord>) =
            records
                .iter()
                .cloned()
                .partition(|record| is_weekday(record.date));

        let employees: Vec<String> = weekday_records
            .iter()
            .map(|record| record.employee_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let dates: Vec<NaiveDate> = weekday_records
            .iter()
            .map(|record| record.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let hours: Vec<Vec<Decimal>> = employees
            .iter()
            .map(|employee_id| {
                dates
                    .iter()
                    .map(|date| {
                        index
                            .get(&(employee_id.clone(), *date))
                            .map_or(Decimal::ZERO, |record| record.hours_worked)
                    })
                    .collect()
            })
            .collect();

        debug!(
            "Built employee-day matrix: employees={}, weekdays={}, weekend_records_excluded={}",
            employees.len(),
            dates.len(),
            weekend_records.len()
        );

        Ok(Self {
            employees,
            dates,
            hours,
            excluded_weekend_records: weekend_records.len(),
        })
    }

    pub fn employees(&self) -> &[String] {
        &self.employees
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Hours row for the employee at `row`, in `dates()` order.
    pub fn day_vector(&self, row: usize) -> &[Decimal] {
        &self.hours[row]
    }

    pub fn excluded_weekend_records(&self) -> usize {
        self.excluded_weekend_records
    }

    /// (employee rows, date columns)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.employees.len(), self.dates.len())
    }

    /// Converts the matrix into numeric feature rows for the outlier model.
    pub fn feature_rows(&self) -> Vec<Vec<f64>> {
        self.hours
            .iter()
            .map(|row| {
                // Decimal always converts to a finite f64, possibly rounded
                row.iter()
                    .map(|hours| hours.to_f64().unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn record(employee_id: &str, date: &str, hours: Decimal) -> TimesheetRecord {
        TimesheetRecord::new(employee_id, d(date), hours)
    }

    #[test]
    fn weekday_index_covers_monday_to_friday() {
        assert!(is_weekday(d("2024-01-01"))); // Monday
        assert!(is_weekday(d("2024-01-05"))); // Friday
        assert!(!is_weekday(d("2024-01-06"))); // Saturday
        assert!(!is_weekday(d("2024-01-07"))); // Sunday
    }

    #[test]
    fn weekend_dates_are_not_columns() {
        let records = vec![
            record("E1", "2024-01-05", dec!(8)),
            record("E1", "2024-01-06", dec!(4)), // Saturday
            record("E2", "2024-01-07", dec!(2)), // Sunday
            record("E2", "2024-01-08", dec!(8)),
        ];

        let matrix = EmployeeDayMatrix::from_records(&records).unwrap();
        assert_eq!(matrix.dates(), &[d("2024-01-05"), d("2024-01-08")]);
        assert_eq!(matrix.excluded_weekend_records(), 2);
    }

    #[test]
    fn rows_and_columns_are_sorted_and_gaps_are_zero() {
        let records = vec![
            record("E2", "2024-01-03", dec!(6)),
            record("E1", "2024-01-02", dec!(8)),
            record("E1", "2024-01-03", dec!(7.5)),
        ];

        let matrix = EmployeeDayMatrix::from_records(&records).unwrap();
        assert_eq!(matrix.employees(), &["E1".to_string(), "E2".to_string()]);
        assert_eq!(matrix.dates(), &[d("2024-01-02"), d("2024-01-03")]);
        assert_eq!(matrix.day_vector(0), &[dec!(8), dec!(7.5)]);
        assert_eq!(matrix.day_vector(1), &[dec!(0), dec!(6)]);
        assert_eq!(matrix.dimensions(), (2, 2));
        assert_eq!(matrix.feature_rows(), vec![vec![8.0, 7.5], vec![0.0, 6.0]]);
    }

    #[test]
    fn employee_with_only_weekend_entries_is_not_a_row() {
        let records = vec![
            record("E1", "2024-01-02", dec!(8)),
            record("E2", "2024-01-06", dec!(8)),
        ];

        let matrix = EmployeeDayMatrix::from_records(&records).unwrap();
        assert_eq!(matrix.employees(), &["E1".to_string()]);
    }

    #[test]
    fn duplicate_weekday_entries_are_rejected() {
        let records = vec![
            record("E1", "2024-01-02", dec!(4)),
            record("E1", "2024-01-02", dec!(4)),
        ];

        let err = EmployeeDayMatrix::from_records(&records).unwrap_err();
        assert!(matches!(
            err,
            TimesheetError::DuplicateKey {
                side: TimesheetSide::Timesheet,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_weekend_entries_are_rejected() {
        let records = vec![
            record("E1", "2024-01-02", dec!(8)),
            record("E1", "2024-01-06", dec!(3)), // Saturday
            record("E1", "2024-01-06", dec!(3)),
        ];

        let err = EmployeeDayMatrix::from_records(&records).unwrap_err();
        assert_eq!(
            err,
            TimesheetError::DuplicateKey {
                side: TimesheetSide::Timesheet,
                employee_id: "E1".to_string(),
                date: d("2024-01-06"),
            }
        );
    }
}
