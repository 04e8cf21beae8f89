pub mod amortization;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::loan::Loan;
use crate::types::{LoanId, PaymentId, PaymentKind};

pub use amortization::{
    add_months, calculate_installment, AmortizationCalculator, AmortizationSchedule,
    ScheduleEntry,
};

/// a recorded payment against a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub loan_id: LoanId,
    pub amount: Money,
    pub kind: PaymentKind,
    pub description: Option<String>,
    pub applied_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(request: NewPayment, kind: PaymentKind, applied_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id: request.loan_id,
            amount: request.amount,
            kind,
            description: request.description,
            applied_at,
        }
    }
}

/// payment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub loan_id: LoanId,
    pub amount: Money,
    #[serde(default)]
    pub kind: Option<PaymentKind>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewPayment {
    pub fn new(loan_id: LoanId, amount: Money) -> Self {
        Self {
            loan_id,
            amount,
            kind: None,
            description: None,
        }
    }

    pub fn kind(mut self, kind: PaymentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// correction of a recorded payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub amount: Money,
    pub kind: PaymentKind,
    #[serde(default)]
    pub description: Option<String>,
}

/// payment together with the loan state it produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub loan: Loan,
}

/// payments must be strictly positive
pub fn validate_payment_amount(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidPaymentAmount { amount });
    }
    Ok(())
}

/// total of the payments recorded against one loan
pub fn total_paid_for(loan_id: LoanId, payments: &[Payment]) -> Money {
    payments
        .iter()
        .filter(|p| p.loan_id == loan_id)
        .map(|p| p.amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_amount_validation() {
        assert!(validate_payment_amount(Money::CENT).is_ok());
        assert!(matches!(
            validate_payment_amount(Money::ZERO),
            Err(LedgerError::InvalidPaymentAmount { .. })
        ));
        assert!(validate_payment_amount(Money::from_major(-5)).is_err());
    }

    #[test]
    fn test_total_paid_filters_by_loan() {
        let loan_a = Uuid::new_v4();
        let loan_b = Uuid::new_v4();
        let now = Utc::now();
        let payments = vec![
            Payment::new(NewPayment::new(loan_a, Money::from_major(100)), PaymentKind::Installment, now),
            Payment::new(NewPayment::new(loan_b, Money::from_major(40)), PaymentKind::Partial, now),
            Payment::new(NewPayment::new(loan_a, Money::from_minor(2_550)), PaymentKind::Prepayment, now),
        ];

        assert_eq!(total_paid_for(loan_a, &payments), Money::from_minor(12_550));
        assert_eq!(total_paid_for(loan_b, &payments), Money::from_major(40));
        assert_eq!(total_paid_for(Uuid::new_v4(), &payments), Money::ZERO);
    }

    #[test]
    fn test_new_payment_deserializes_with_defaults() {
        let loan_id = Uuid::new_v4();
        let json = format!(r#"{{"loan_id":"{loan_id}","amount":"250.50"}}"#);
        let request: NewPayment = serde_json::from_str(&json).unwrap();

        assert_eq!(request.amount, Money::from_minor(25_050));
        assert_eq!(request.kind, None);
        assert_eq!(request.description, None);
    }
}
