// src/reconcile.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::TimesheetError;
use crate::timesheet::{
    index_by_key, validate_timesheet, TimesheetRecord, TimesheetRow, TimesheetSide,
};

// --- Reconciliation Structures ---

/// One (employee, date) present in both timesheets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub employee_id: String,
    pub date: NaiveDate,
    pub hours_client: Decimal,
    pub hours_company: Decimal,
    pub discrepancy: Decimal, // hours_client - hours_company
}

impl MatchedPair {
    fn new(client: &TimesheetRecord, company: &TimesheetRecord) -> Self {
        Self {
            employee_id: client.employee_id.clone(),
            date: client.date,
            hours_client: client.hours_worked,
            hours_company: company.hours_worked,
            discrepancy: client.hours_worked - company.hours_worked,
        }
    }

    pub fn has_discrepancy(&self) -> bool {
        !self.discrepancy.is_zero()
    }
}

/// A record whose key exists in only one of the two timesheets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedRecord {
    pub side: TimesheetSide,
    pub employee_id: String,
    pub date: NaiveDate,
    pub hours_worked: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub matched: usize,
    pub with_discrepancy: usize,
    pub unmatched_client: usize,
    pub unmatched_company: usize,
    /// Sum of all discrepancies, clamped to the `Decimal` range.
    pub net_discrepancy: Decimal,
}

/// Result of joining a client timesheet against a company timesheet.
///
/// Rows are ordered by employee_id, then date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    matched: Vec<MatchedPair>,
    unmatched: Vec<UnmatchedRecord>,
}

impl Reconciliation {
    /// Every matched pair, including those that agree.
    pub fn matched(&self) -> &[MatchedPair] {
        &self.matched
    }

    /// The discrepancy report: matched pairs whose hours differ.
    pub fn discrepancies(&self) -> Vec<MatchedPair> {
        self.matched
            .iter()
            .filter(|pair| pair.has_discrepancy())
            .cloned()
            .collect()
    }

    /// Keys present on one side only. Never part of the discrepancy report.
    pub fn unmatched(&self) -> &[UnmatchedRecord] {
        &self.unmatched
    }

    pub fn summary(&self) -> ReconciliationSummary {
        let count_side = |side: TimesheetSide| {
            self.unmatched
                .iter()
                .filter(|record| record.side == side)
                .count()
        };
        ReconciliationSummary {
            matched: self.matched.len(),
            with_discrepancy: self
                .matched
                .iter()
                .filter(|pair| pair.has_discrepancy())
                .count(),
            unmatched_client: count_side(TimesheetSide::Client),
            unmatched_company: count_side(TimesheetSide::Company),
            net_discrepancy: self
                .matched
                .iter()
                .fold(Decimal::ZERO, |total, pair| total.saturating_add(pair.discrepancy)),
        }
    }
}

// --- Reconciler ---

/// Validates both raw timesheets and reconciles them.
pub fn reconcile(
    client: &[TimesheetRow],
    company: &[TimesheetRow],
) -> Result<Reconciliation, TimesheetError> {
    let client = validate_timesheet(client, TimesheetSide::Client)?;
    let company = validate_timesheet(company, TimesheetSide::Company)?;
    reconcile_records(&client, &company)
}

/// Inner-joins already validated records on (employee_id, date).
///
/// Duplicate keys on either side fail the whole operation.
pub fn reconcile_records(
    client: &[TimesheetRecord],
    company: &[TimesheetRecord],
) -> Result<Reconciliation, TimesheetError> {
    let client_index = index_by_key(client, TimesheetSide::Client)?;
    let company_index = index_by_key(company, TimesheetSide::Company)?;

    let mut matched = Vec::new();
    let mut unmatched = Vec::new();

    // BTreeMap iteration keeps the report sorted by (employee_id, date)
    for (key, client_record) in &client_index {
        match company_index.get(key) {
            Some(company_record) => matched.push(MatchedPair::new(client_record, company_record)),
            None => unmatched.push(unmatched_record(client_record, TimesheetSide::Client)),
        }
    }
    for (key, company_record) in &company_index {
        if !client_index.contains_key(key) {
            unmatched.push(unmatched_record(company_record, TimesheetSide::Company));
        }
    }
    unmatched.sort_by(|a, b| {
        (&a.employee_id, a.date, a.side == TimesheetSide::Company).cmp(&(
            &b.employee_id,
            b.date,
            b.side == TimesheetSide::Company,
        ))
    });

    let reconciliation = Reconciliation { matched, unmatched };
    let summary = reconciliation.summary();
    info!(
        "Reconciled timesheets: matched={}, discrepancies={}, client_only={}, company_only={}",
        summary.matched,
        summary.with_discrepancy,
        summary.unmatched_client,
        summary.unmatched_company
    );
    debug!("Net discrepancy: {}", summary.net_discrepancy);
    Ok(reconciliation)
}

fn unmatched_record(record: &TimesheetRecord, side: TimesheetSide) -> UnmatchedRecord {
    UnmatchedRecord {
        side,
        employee_id: record.employee_id.clone(),
        date: record.date,
        hours_worked: record.hours_worked,
    }
}
