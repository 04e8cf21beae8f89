use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::LedgerError;

/// unique identifier for a client
pub type ClientId = Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a payment
pub type PaymentId = Uuid;

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// outstanding balance above zero
    Active,
    /// fully paid off
    Paid,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanStatus::Active => write!(f, "active"),
            LoanStatus::Paid => write!(f, "paid"),
        }
    }
}

/// client status; inactive clients are soft-deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
}

/// what a payment was made for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    /// regular monthly installment
    #[default]
    Installment,
    /// less than one installment
    Partial,
    /// extra principal ahead of schedule
    Prepayment,
    /// payoff of the remaining balance
    Settlement,
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentKind::Installment => "installment",
            PaymentKind::Partial => "partial",
            PaymentKind::Prepayment => "prepayment",
            PaymentKind::Settlement => "settlement",
        };
        f.write_str(name)
    }
}

/// where an active loan stands relative to its end date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaturityStatus {
    /// end date already passed
    Overdue,
    /// end date within the configured warning window
    DueSoon,
    /// nothing pending
    Current,
}

/// calendar period used by summaries and performance reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Today,
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl ReportPeriod {
    /// inclusive first and last day of the period containing `today`
    pub fn bounds(&self, today: NaiveDate, week_start: Weekday) -> (NaiveDate, NaiveDate) {
        match self {
            ReportPeriod::Today => (today, today),
            ReportPeriod::Week => {
                let offset = (7 + today.weekday().num_days_from_monday()
                    - week_start.num_days_from_monday())
                    % 7;
                let first = today - Duration::days(offset as i64);
                (first, first + Duration::days(6))
            }
            ReportPeriod::Month => month_bounds(today.year(), today.month()),
            ReportPeriod::Quarter => {
                let first_month = (today.month0() / 3) * 3 + 1;
                let (first, _) = month_bounds(today.year(), first_month);
                let (_, last) = month_bounds(today.year(), first_month + 2);
                (first, last)
            }
            ReportPeriod::Year => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today),
            ),
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(ReportPeriod::Today),
            "week" => Ok(ReportPeriod::Week),
            "month" => Ok(ReportPeriod::Month),
            "quarter" => Ok(ReportPeriod::Quarter),
            "year" => Ok(ReportPeriod::Year),
            other => Err(LedgerError::InvalidInput {
                message: format!("unknown report period: {other}"),
            }),
        }
    }
}

/// first and last day of a month
pub fn month_bounds(year: i32, month: u32) -> (NaiveDate, NaiveDate) {
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next.and_then(|d| d.pred_opt()).unwrap_or(first);
    (first, last)
}

/// inclusive date range; open ends match everything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from: Some(from), to: Some(to) }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}
