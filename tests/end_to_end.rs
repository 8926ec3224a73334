// tests/end_to_end.rs
use rust_decimal_macros::dec;
use timesheet_reconciler::{
    detect_anomalies, reconcile,
    report::{read_timesheet, write_anomaly_report, write_matched_pairs},
    AnomalyParams, TimesheetError,
};

const CLIENT_CSV: &str = "\
Employee ID,Date,Hours Worked
E1,2024-01-02,8
E1,2024-01-03,8
E2,2024-01-02,6
";

const COMPANY_CSV: &str = "\
employee_id,date,hours_worked
E1,2024-01-02 00:00:00,7.5
E1,2024-01-03,8
E3,2024-01-02,8
";

#[test]
fn csv_files_produce_a_one_row_discrepancy_report() {
    let client = read_timesheet(CLIENT_CSV.as_bytes()).unwrap();
    let company = read_timesheet(COMPANY_CSV.as_bytes()).unwrap();

    let reconciliation = reconcile(&client, &company).unwrap();
    let report = reconciliation.discrepancies();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].employee_id, "E1");
    assert_eq!(report[0].date.to_string(), "2024-01-02");
    assert_eq!(report[0].discrepancy, dec!(0.5));

    let mut output = Vec::new();
    write_matched_pairs(&mut output, &report).unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        "employee_id,date,hours_client,hours_company,discrepancy\nE1,2024-01-02,8,7.5,0.5\n"
    );

    let summary = reconciliation.summary();
    assert_eq!(summary.unmatched_client, 1);
    assert_eq!(summary.unmatched_company, 1);
}

#[test]
fn csv_discrepancy_smaller_than_float_precision_is_reported() {
    let client_csv = "employee_id,date,hours_worked\nE1,2024-01-02,8.00000000000000001\n";
    let company_csv = "employee_id,date,hours_worked\nE1,2024-01-02,8\n";
    let client = read_timesheet(client_csv.as_bytes()).unwrap();
    let company = read_timesheet(company_csv.as_bytes()).unwrap();

    let report = reconcile(&client, &company).unwrap().discrepancies();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].discrepancy, dec!(0.00000000000000001));
}

#[test]
fn csv_with_blank_hours_is_rejected_before_the_join() {
    let client = read_timesheet(CLIENT_CSV.as_bytes()).unwrap();
    let company = read_timesheet("employee_id,date,hours_worked\nE1,2024-01-02,\n".as_bytes())
        .unwrap();

    let err = reconcile(&client, &company).unwrap_err();
    assert!(matches!(
        err,
        TimesheetError::Validation { ref field, row: 0, .. } if field == "hours_worked"
    ));
}

#[test]
fn anomaly_report_round_trips_through_csv_output() {
    let mut csv = String::from("employee_id,date,hours_worked\n");
    for employee in ["A", "B", "C", "D"] {
        for day in 8..=12 {
            csv.push_str(&format!("{},2024-01-{:02},8\n", employee, day));
        }
    }
    csv.push_str("Z,2024-01-09,8\n");
    csv.push_str("Z,2024-01-13,9\n"); // Saturday, ignored

    let rows = read_timesheet(csv.as_bytes()).unwrap();
    let params = AnomalyParams {
        contamination: 0.2,
        n_estimators: 64,
        seed: 3,
    };
    let report = detect_anomalies(&rows, &params).unwrap();

    let flagged: Vec<&str> = report
        .anomalies()
        .map(|result| result.employee_id.as_str())
        .collect();
    assert_eq!(flagged, vec!["Z"]);
    assert_eq!(report.dates.len(), 5);
    assert_eq!(report.excluded_weekend_records, 1);

    let mut output = Vec::new();
    write_anomaly_report(&mut output, &report).unwrap();
    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "employee_id,2024-01-08,2024-01-09,2024-01-10,2024-01-11,2024-01-12,score,is_anomalous"
    );
    assert!(lines[5].starts_with("Z,0,8,0,0,0,"));
    assert!(lines[5].ends_with(",true"));
    assert!(lines[1..5].iter().all(|line| line.ends_with(",false")));
}
