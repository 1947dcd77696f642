use crate::cash_flow::CashFlowReport;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One calendar day of fund movements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date:            NaiveDate,
    pub entries:         usize,
    pub inflow:          f64,
    /// Sum of withdrawals, as a positive number.
    pub outflow:         f64,
    pub net:             f64,
    pub closing_balance: f64,
}

/// Group the report's entries by day. Entries are already in date order,
/// so each day is a contiguous run.
pub fn daily_totals(report: &CashFlowReport) -> Vec<DailyTotal> {
    let mut days: Vec<DailyTotal> = Vec::new();
    for entry in &report.entries {
        let date = entry.timestamp.date();
        if !days.last().is_some_and(|d| d.date == date) {
            days.push(DailyTotal {
                date,
                entries: 0,
                inflow: 0.0,
                outflow: 0.0,
                net: 0.0,
                closing_balance: 0.0,
            });
        }
        let Some(day) = days.last_mut() else { continue };
        day.entries += 1;
        if entry.amount >= 0.0 {
            day.inflow += entry.amount;
        } else {
            day.outflow -= entry.amount;
        }
        day.net += entry.amount;
        day.closing_balance = entry.balance;
    }
    days
}
