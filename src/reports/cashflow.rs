use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::payments::Payment;
use crate::types::{DateRange, PaymentKind, ReportPeriod};

use super::{applied_on, average_rate_percent, LedgerData};

/// money received on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowRow {
    pub date: NaiveDate,
    pub inflow: Money,
    pub operations: usize,
}

/// payments of one kind received on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummaryRow {
    pub date: NaiveDate,
    pub kind: PaymentKind,
    pub payments: usize,
    pub total: Money,
}

/// origination and collection figures for loans started in a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub period: ReportPeriod,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_loans: usize,
    pub total_lent: Money,
    /// payments inside the period on those same loans
    pub total_collected: Money,
    pub average_rate_percent: Decimal,
    pub total_clients: usize,
}

#[derive(Default)]
struct Tally {
    total: Money,
    count: usize,
}

impl Tally {
    fn add(&mut self, amount: Money) {
        self.total += amount;
        self.count += 1;
    }
}

/// daily inflow inside the range, newest day first
pub fn cash_flow(payments: &[Payment], range: DateRange) -> Vec<CashFlowRow> {
    let mut days: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
    for payment in payments {
        let day = applied_on(payment);
        if range.contains(day) {
            days.entry(day).or_default().add(payment.amount);
        }
    }

    days.into_iter()
        .rev()
        .map(|(date, tally)| CashFlowRow {
            date,
            inflow: tally.total,
            operations: tally.count,
        })
        .collect()
}

/// payment totals grouped by day and kind, newest day first
pub fn payment_summary(payments: &[Payment], range: DateRange) -> Vec<PaymentSummaryRow> {
    let mut groups: BTreeMap<(NaiveDate, PaymentKind), Tally> = BTreeMap::new();
    for payment in payments {
        let day = applied_on(payment);
        if range.contains(day) {
            groups.entry((day, payment.kind)).or_default().add(payment.amount);
        }
    }

    let mut rows: Vec<PaymentSummaryRow> = groups
        .into_iter()
        .map(|((date, kind), tally)| PaymentSummaryRow {
            date,
            kind,
            payments: tally.count,
            total: tally.total,
        })
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.kind.cmp(&b.kind)));
    rows
}

pub fn performance(data: &LedgerData, period: ReportPeriod, from: NaiveDate, to: NaiveDate) -> PerformanceReport {
    let window = DateRange::between(from, to);
    let originated: Vec<_> = data.loans.iter().filter(|l| window.contains(l.start_date)).collect();
    let loan_ids: BTreeSet<_> = originated.iter().map(|l| l.id).collect();

    let total_collected = data
        .payments
        .iter()
        .filter(|p| loan_ids.contains(&p.loan_id) && window.contains(applied_on(p)))
        .map(|p| p.amount)
        .sum();

    PerformanceReport {
        period,
        from,
        to,
        total_loans: originated.len(),
        total_lent: originated.iter().map(|l| l.principal).sum(),
        total_collected,
        average_rate_percent: average_rate_percent(originated.iter().copied()),
        total_clients: originated.iter().map(|l| l.client_id).collect::<BTreeSet<_>>().len(),
    }
}
