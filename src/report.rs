// src/report.rs
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};
use tracing::{debug, info};

use crate::anomaly::AnomalyReport;
use crate::reconcile::MatchedPair;
use crate::timesheet::TimesheetRow;

const MATCHED_PAIR_HEADER: [&str; 5] = [
    "employee_id",
    "date",
    "hours_client",
    "hours_company",
    "discrepancy",
];

// --- Reading ---

/// CSV-side row. Hours stay text until parsed as an exact decimal, since the
/// csv deserializer would otherwise read them through `f64`.
#[derive(Debug, Deserialize)]
struct CsvTimesheetRow {
    #[serde(default, alias = "Employee ID", alias = "employee")]
    employee_id: Option<String>,
    #[serde(default, alias = "Date")]
    date: Option<String>,
    #[serde(default, alias = "Hours Worked", alias = "hours")]
    hours_worked: Option<String>,
}

impl CsvTimesheetRow {
    fn into_row(self) -> Result<TimesheetRow> {
        let hours_worked = match self.hours_worked.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                Decimal::from_str_exact(raw)
                    .with_context(|| format!("hours_worked '{}' is not a decimal number", raw))?,
            ),
        };
        Ok(TimesheetRow {
            employee_id: self.employee_id,
            date: self.date,
            hours_worked,
        })
    }
}

/// Reads timesheet rows from CSV.
///
/// Headers may be `employee_id,date,hours_worked` or the spreadsheet style
/// `Employee ID,Date,Hours Worked`. Empty cells become missing fields.
pub fn read_timesheet<R: Read>(reader: R) -> Result<Vec<TimesheetRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader
        .deserialize::<CsvTimesheetRow>()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(anyhow::Error::from)
                .and_then(CsvTimesheetRow::into_row)
                .with_context(|| format!("Failed to parse CSV row {}", index))
        })
        .collect()
}

pub fn read_timesheet_file(path: &Path) -> Result<Vec<TimesheetRow>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open timesheet {}", path.display()))?;
    let rows = read_timesheet(file)
        .with_context(|| format!("Failed to read timesheet {}", path.display()))?;
    info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

// --- Writing ---

/// Writes matched pairs as a flat CSV table. The header is always written.
pub fn write_matched_pairs<W: Write>(writer: W, pairs: &[MatchedPair]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer
        .write_record(MATCHED_PAIR_HEADER)
        .context("Failed to write report header")?;
    for pair in pairs {
        csv_writer.serialize(pair).with_context(|| {
            format!("Failed to write row for {} on {}", pair.employee_id, pair.date)
        })?;
    }
    csv_writer.flush().context("Failed to flush report")?;
    debug!("Wrote {} matched pairs", pairs.len());
    Ok(())
}

/// Writes one row per employee: id, one column per weekday, score, flag.
pub fn write_anomaly_report<W: Write>(writer: W, report: &AnomalyReport) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["employee_id".to_string()];
    header.extend(report.dates.iter().map(|date| date.to_string()));
    header.push("score".to_string());
    header.push("is_anomalous".to_string());
    csv_writer
        .write_record(&header)
        .context("Failed to write anomaly header")?;

    for result in &report.results {
        let mut record = vec![result.employee_id.clone()];
        record.extend(result.day_vector.iter().map(|hours| hours.to_string()));
        record.push(format!("{:.6}", result.score));
        record.push(result.is_anomalous.to_string());
        csv_writer
            .write_record(&record)
            .with_context(|| format!("Failed to write anomaly row for {}", result.employee_id))?;
    }
    csv_writer.flush().context("Failed to flush anomaly report")?;
    debug!("Wrote {} anomaly rows", report.results.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::AnomalyResult;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn reads_snake_case_headers() {
        let data = "employee_id,date,hours_worked\nE1,2024-01-02,8\nE2,2024-01-02,7.5\n";
        let rows = read_timesheet(data.as_bytes()).unwrap();
        assert_eq!(
            rows,
            vec![
                TimesheetRow::new("E1", "2024-01-02", dec!(8)),
                TimesheetRow::new("E2", "2024-01-02", dec!(7.5)),
            ]
        );
    }

    #[test]
    fn reads_spreadsheet_headers_and_empty_cells() {
        let data = "Employee ID,Date,Hours Worked\n101, 2024-01-02 00:00:00 ,8\n102,2024-01-02,\n";
        let rows = read_timesheet(data.as_bytes()).unwrap();
        assert_eq!(rows[0], TimesheetRow::new("101", "2024-01-02 00:00:00", dec!(8)));
        assert_eq!(rows[1].hours_worked, None);
    }

    #[test]
    fn non_numeric_hours_fail_to_parse() {
        let data = "employee_id,date,hours_worked\nE1,2024-01-02,eight\n";
        let err = read_timesheet(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 0"));
    }

    #[test]
    fn hours_keep_digits_beyond_float_precision() {
        let data = "employee_id,date,hours_worked\nE1,2024-01-02,8.00000000000000001\n";
        let rows = read_timesheet(data.as_bytes()).unwrap();
        assert_eq!(rows[0].hours_worked, Some(dec!(8.00000000000000001)));
        assert_ne!(rows[0].hours_worked, Some(dec!(8)));
    }

    #[test]
    fn matched_pairs_keep_their_sign() {
        let pairs = vec![MatchedPair {
            employee_id: "E1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            hours_client: dec!(7.5),
            hours_company: dec!(8),
            discrepancy: dec!(-0.5),
        }];
        let mut output = Vec::new();
        write_matched_pairs(&mut output, &pairs).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "employee_id,date,hours_client,hours_company,discrepancy\nE1,2024-01-02,7.5,8,-0.5\n"
        );
    }

    #[test]
    fn empty_report_still_has_a_header() {
        let mut output = Vec::new();
        write_matched_pairs(&mut output, &[]).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "employee_id,date,hours_client,hours_company,discrepancy\n"
        );
    }

    #[test]
    fn anomaly_report_is_one_wide_row_per_employee() {
        let report = AnomalyReport {
            dates: vec![
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            ],
            results: vec![
                AnomalyResult {
                    employee_id: "E1".to_string(),
                    day_vector: vec![dec!(8), dec!(8)],
                    score: 0.4,
                    is_anomalous: false,
                },
                AnomalyResult {
                    employee_id: "E2".to_string(),
                    day_vector: vec![dec!(0), dec!(8)],
                    score: 0.75,
                    is_anomalous: true,
                },
            ],
            excluded_weekend_records: 0,
        };
        let mut output = Vec::new();
        write_anomaly_report(&mut output, &report).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "employee_id,2024-01-02,2024-01-03,score,is_anomalous\n\
             E1,8,8,0.400000,false\n\
             E2,0,8,0.750000,true\n"
        );
    }
}
