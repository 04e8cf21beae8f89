use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{LoanId, LoanStatus, PaymentId, PaymentKind};
use crate::views::{LoanView, PaymentView};

const APPLIED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Loans,
    Payments,
}

impl FromStr for ExportKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loans" => Ok(ExportKind::Loans),
            "payments" => Ok(ExportKind::Payments),
            other => Err(LedgerError::InvalidInput {
                message: format!("unknown export type: {other}"),
            }),
        }
    }
}

#[derive(Serialize)]
struct LoanRecord<'a> {
    id: LoanId,
    first_name: &'a str,
    last_name: &'a str,
    national_id: &'a str,
    principal: Money,
    annual_rate_percent: Decimal,
    term_months: u32,
    monthly_installment: Money,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: LoanStatus,
    outstanding_balance: Money,
}

impl<'a> From<&'a LoanView> for LoanRecord<'a> {
    fn from(view: &'a LoanView) -> Self {
        Self {
            id: view.id,
            first_name: &view.client.first_name,
            last_name: &view.client.last_name,
            national_id: &view.client.national_id,
            principal: view.principal,
            annual_rate_percent: view.annual_rate_percent,
            term_months: view.term_months,
            monthly_installment: view.monthly_installment,
            start_date: view.start_date,
            end_date: view.end_date,
            status: view.status,
            outstanding_balance: view.outstanding_balance,
        }
    }
}

#[derive(Serialize)]
struct PaymentRecord<'a> {
    id: PaymentId,
    first_name: &'a str,
    last_name: &'a str,
    national_id: &'a str,
    amount: Money,
    kind: PaymentKind,
    applied_at: String,
    description: Option<&'a str>,
}

impl<'a> From<&'a PaymentView> for PaymentRecord<'a> {
    fn from(view: &'a PaymentView) -> Self {
        Self {
            id: view.id,
            first_name: &view.client.first_name,
            last_name: &view.client.last_name,
            national_id: &view.client.national_id,
            amount: view.amount,
            kind: view.kind,
            applied_at: view.applied_at.format(APPLIED_AT_FORMAT).to_string(),
            description: view.description.as_deref(),
        }
    }
}

/// header row plus one line per loan
pub fn export_loans_csv(rows: &[LoanView]) -> Result<String> {
    write_csv("loans", rows.iter().map(LoanRecord::from))
}

/// header row plus one line per payment
pub fn export_payments_csv(rows: &[PaymentView]) -> Result<String> {
    write_csv("payments", rows.iter().map(PaymentRecord::from))
}

fn write_csv<T: Serialize>(report: &str, records: impl Iterator<Item = T>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut written = 0usize;
    for record in records {
        writer.serialize(record)?;
        written += 1;
    }

    if written == 0 {
        return Err(LedgerError::NoData {
            report: report.to_string(),
        });
    }

    let bytes = writer.into_inner().map_err(|e| LedgerError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| LedgerError::InvalidInput {
        message: format!("export produced invalid utf-8: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::ClientIdentity;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn identity() -> ClientIdentity {
        ClientIdentity {
            client_id: Uuid::new_v4(),
            first_name: "Ana".to_string(),
            last_name: "Torres, Jr".to_string(),
            national_id: "111".to_string(),
            phone: None,
            email: None,
        }
    }

    fn payment_view(description: Option<&str>) -> PaymentView {
        PaymentView {
            id: Uuid::new_v4(),
            loan_id: Uuid::new_v4(),
            client: identity(),
            amount: Money::from_str_exact("150.5").unwrap(),
            kind: PaymentKind::Partial,
            description: description.map(str::to_string),
            applied_at: Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_payments_csv_layout_and_quoting() {
        let view = payment_view(Some("said \"thanks\", paid early"));
        let csv = export_payments_csv(&[view.clone()]).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("id,first_name,last_name,national_id,amount,kind,applied_at,description")
        );
        assert_eq!(
            lines.next().unwrap(),
            format!(
                "{},Ana,\"Torres, Jr\",111,150.50,partial,2024-03-01 14:30:00,\"said \"\"thanks\"\", paid early\"",
                view.id
            )
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_missing_description_is_empty_field() {
        let view = payment_view(None);
        let csv = export_payments_csv(&[view]).unwrap();
        assert!(csv.lines().nth(1).unwrap().ends_with("2024-03-01 14:30:00,"));
    }

    #[test]
    fn test_loans_csv() {
        let view = LoanView {
            id: Uuid::new_v4(),
            client: identity(),
            principal: Money::from_major(10_000),
            annual_rate_percent: dec!(12),
            term_months: 12,
            monthly_installment: Money::from_str_exact("888.49").unwrap(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            outstanding_balance: Money::from_major(10_000),
            status: LoanStatus::Active,
            total_paid: Money::ZERO,
        };

        let csv = export_loans_csv(&[view.clone()]).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "id,first_name,last_name,national_id,principal,annual_rate_percent,term_months,\
             monthly_installment,start_date,end_date,status,outstanding_balance"
        );
        assert_eq!(
            lines[1],
            format!("{},Ana,\"Torres, Jr\",111,10000.00,12,12,888.49,2024-01-15,2025-01-15,active,10000.00", view.id)
        );
    }

    #[test]
    fn test_empty_export_is_no_data() {
        assert!(matches!(
            export_loans_csv(&[]),
            Err(LedgerError::NoData { report }) if report == "loans"
        ));
        assert!(matches!(export_payments_csv(&[]), Err(LedgerError::NoData { .. })));
    }

    #[test]
    fn test_export_kind_parse() {
        assert_eq!("Loans".parse::<ExportKind>().unwrap(), ExportKind::Loans);
        assert!("clients".parse::<ExportKind>().is_err());
    }
}
