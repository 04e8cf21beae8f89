pub mod cashflow;
pub mod export;
pub mod portfolio;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::decimal::Money;
use crate::errors::Result;
use crate::loan::Loan;
use crate::payments::Payment;
use crate::repository::LedgerRepository;
use crate::types::{ClientId, DateRange, LoanStatus, PaymentKind};
use crate::views::Directory;

pub use cashflow::{cash_flow, payment_summary, performance, CashFlowRow, PaymentSummaryRow, PerformanceReport};
pub use export::{export_loans_csv, export_payments_csv, ExportKind};
pub use portfolio::{
    client_report, delinquency_report, loan_report, payment_report, statistics, top_clients,
    ClientReportRow, DelinquencyRow, Statistics, TopClientRow,
};

/// every row of the store, loaded once per report
#[derive(Debug, Clone, Default)]
pub struct LedgerData {
    pub clients: Vec<Client>,
    pub loans: Vec<Loan>,
    pub payments: Vec<Payment>,
}

impl LedgerData {
    pub fn load(repository: &dyn LedgerRepository) -> Result<Self> {
        Ok(Self {
            clients: repository.list_clients()?,
            loans: repository.list_loans()?,
            payments: repository.list_payments()?,
        })
    }

    pub fn directory(&self) -> Directory<'_> {
        Directory::new(&self.clients, &self.loans)
    }

    /// sum of payments against loans owned by a client
    pub fn paid_by_client(&self, client_id: ClientId) -> Money {
        let directory = self.directory();
        self.payments
            .iter()
            .filter(|p| directory.loan(p.loan_id).map(|l| l.client_id) == Some(client_id))
            .map(|p| p.amount)
            .sum()
    }
}

/// loan report selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoanFilter {
    /// matched against the start date
    #[serde(default)]
    pub start: DateRange,
    #[serde(default)]
    pub status: Option<LoanStatus>,
}

impl LoanFilter {
    pub fn matches(&self, loan: &Loan) -> bool {
        self.start.contains(loan.start_date) && self.status.map_or(true, |s| s == loan.status)
    }
}

/// payment report selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaymentFilter {
    /// matched against the date the payment was applied
    #[serde(default)]
    pub applied: DateRange,
    #[serde(default)]
    pub kind: Option<PaymentKind>,
}

impl PaymentFilter {
    pub fn matches(&self, payment: &Payment) -> bool {
        self.applied.contains(applied_on(payment)) && self.kind.map_or(true, |k| k == payment.kind)
    }
}

/// calendar day (utc) a payment was applied
pub fn applied_on(payment: &Payment) -> NaiveDate {
    payment.applied_at.date_naive()
}

/// mean annual rate in percent, zero when there are no loans
pub fn average_rate_percent<'a>(loans: impl IntoIterator<Item = &'a Loan>) -> Decimal {
    let (sum, count) = loans
        .into_iter()
        .fold((Decimal::ZERO, 0u32), |(sum, count), l| (sum + l.annual_rate_percent, count + 1));

    if count == 0 {
        return Decimal::ZERO;
    }
    (sum / Decimal::from(count)).round_dp(2).normalize()
}
