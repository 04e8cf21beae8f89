use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::payments::{add_months, calculate_installment, validate_payment_amount, AmortizationSchedule};
use crate::types::{ClientId, LoanId, LoanStatus, MaturityStatus};

/// largest principal a loan may carry, in whole currency units
pub const MAX_PRINCIPAL_MAJOR: i64 = 1_000_000_000_000;

/// loan origination request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoan {
    pub client_id: ClientId,
    pub principal: Money,
    pub annual_rate_percent: Decimal,
    pub term_months: u32,
    /// defaults to today
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

impl NewLoan {
    pub fn new(client_id: ClientId, principal: Money, annual_rate_percent: Decimal, term_months: u32) -> Self {
        Self {
            client_id,
            principal,
            annual_rate_percent,
            term_months,
            start_date: None,
        }
    }

    pub fn starting(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// reject terms the installment formula cannot amortize
    pub fn validate(&self, config: &LedgerConfig) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(LedgerError::InvalidLoanTerms {
                message: format!("principal must be positive, got {}", self.principal),
            });
        }

        if self.principal > Money::from_major(MAX_PRINCIPAL_MAJOR) {
            return Err(LedgerError::InvalidLoanTerms {
                message: format!(
                    "principal {} exceeds maximum of {}",
                    self.principal,
                    Money::from_major(MAX_PRINCIPAL_MAJOR)
                ),
            });
        }

        if self.term_months == 0 {
            return Err(LedgerError::InvalidLoanTerms {
                message: "term must be at least one month".to_string(),
            });
        }

        if self.term_months > config.max_term_months {
            return Err(LedgerError::InvalidLoanTerms {
                message: format!(
                    "term of {} months exceeds maximum of {}",
                    self.term_months, config.max_term_months
                ),
            });
        }

        if self.annual_rate_percent < Decimal::ZERO {
            return Err(LedgerError::InvalidLoanTerms {
                message: format!("rate must not be negative, got {}%", self.annual_rate_percent),
            });
        }

        Ok(())
    }
}

/// an amortizing loan; aggregate root for its payments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub client_id: ClientId,
    pub principal: Money,
    pub annual_rate_percent: Decimal,
    pub term_months: u32,
    pub monthly_installment: Money,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub outstanding_balance: Money,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
}

/// balance and status before and after a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    pub previous_balance: Money,
    pub new_balance: Money,
    pub previous_status: LoanStatus,
    pub new_status: LoanStatus,
}

impl BalanceChange {
    /// loan moved from active to paid
    pub fn settled(&self) -> bool {
        self.previous_status == LoanStatus::Active && self.new_status == LoanStatus::Paid
    }

    /// loan moved from paid back to active
    pub fn reopened(&self) -> bool {
        self.previous_status == LoanStatus::Paid && self.new_status == LoanStatus::Active
    }
}

impl Loan {
    /// validate terms, derive the installment and end date
    pub fn originate(
        request: &NewLoan,
        config: &LedgerConfig,
        today: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        request.validate(config)?;

        let annual_rate = Rate::from_percent(request.annual_rate_percent);
        let monthly_installment =
            calculate_installment(request.principal, annual_rate, request.term_months)?;
        let start_date = request.start_date.unwrap_or(today);
        let end_date = add_months(start_date, request.term_months)?;

        Ok(Self {
            id: Uuid::new_v4(),
            client_id: request.client_id,
            principal: request.principal,
            annual_rate_percent: request.annual_rate_percent,
            term_months: request.term_months,
            monthly_installment,
            start_date,
            end_date,
            outstanding_balance: request.principal,
            status: LoanStatus::Active,
            created_at,
        })
    }

    pub fn annual_rate(&self) -> Rate {
        Rate::from_percent(self.annual_rate_percent)
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    /// amount repaid so far
    pub fn amount_repaid(&self) -> Money {
        self.principal - self.outstanding_balance
    }

    /// full schedule from the stored terms and installment
    pub fn schedule(&self) -> Result<AmortizationSchedule> {
        AmortizationSchedule::generate(
            self.principal,
            self.annual_rate(),
            self.term_months,
            self.monthly_installment,
            self.start_date,
        )
    }

    /// active and past its end date
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_active() && self.end_date < today
    }

    pub fn maturity_status(&self, today: NaiveDate, due_soon_days: u32) -> MaturityStatus {
        if self.end_date < today {
            MaturityStatus::Overdue
        } else if today
            .checked_add_signed(Duration::days(i64::from(due_soon_days)))
            .map_or(true, |horizon| self.end_date < horizon)
        {
            // a horizon past the calendar covers every remaining end date
            MaturityStatus::DueSoon
        } else {
            MaturityStatus::Current
        }
    }

    /// days since the end date; negative while the loan is still running
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        (today - self.end_date).num_days()
    }

    /// apply a payment to the outstanding balance
    ///
    /// Either every check passes and balance and status both change, or the
    /// loan is left untouched.
    pub fn apply_payment(&mut self, amount: Money) -> Result<BalanceChange> {
        validate_payment_amount(amount)?;

        if self.status == LoanStatus::Paid {
            return Err(LedgerError::InactiveLoan { loan_id: self.id });
        }

        if amount > self.outstanding_balance {
            return Err(LedgerError::ExceedsBalance {
                balance: self.outstanding_balance,
                requested: amount,
            });
        }

        let new_balance = self.outstanding_balance - amount;
        Ok(self.set_balance(new_balance))
    }

    /// re-derive the balance after a recorded payment changed amount
    ///
    /// `total_paid` is the sum of all recorded payments including the
    /// uncorrected `previous` amount.
    pub fn correct_payment(
        &mut self,
        total_paid: Money,
        previous: Money,
        corrected: Money,
    ) -> Result<BalanceChange> {
        validate_payment_amount(corrected)?;

        let others = total_paid - previous;
        let available = (self.principal - others).floor_zero();
        if corrected > available {
            return Err(LedgerError::ExceedsBalance {
                balance: available,
                requested: corrected,
            });
        }

        self.rederive_balance(others + corrected)
    }

    /// re-derive the balance after a recorded payment was removed
    pub fn remove_payment(&mut self, total_paid: Money, removed: Money) -> Result<BalanceChange> {
        self.rederive_balance(total_paid - removed)
    }

    /// balance = principal - sum of payments
    pub fn rederive_balance(&mut self, total_paid: Money) -> Result<BalanceChange> {
        if total_paid.is_negative() {
            return Err(LedgerError::CalculationError {
                message: format!("negative payment total {total_paid} for loan {}", self.id),
            });
        }

        if total_paid > self.principal {
            return Err(LedgerError::ExceedsBalance {
                balance: self.principal,
                requested: total_paid,
            });
        }

        let new_balance = self.principal - total_paid;
        Ok(self.set_balance(new_balance))
    }

    fn set_balance(&mut self, new_balance: Money) -> BalanceChange {
        let previous_balance = self.outstanding_balance;
        let previous_status = self.status;

        self.outstanding_balance = new_balance.floor_zero();
        self.status = if self.outstanding_balance.is_zero() {
            LoanStatus::Paid
        } else {
            LoanStatus::Active
        };

        BalanceChange {
            previous_balance,
            new_balance: self.outstanding_balance,
            previous_status,
            new_status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn loan(principal: i64, percent: Decimal, term: u32) -> Loan {
        let request = NewLoan::new(Uuid::new_v4(), Money::from_major(principal), percent, term);
        Loan::originate(&request, &LedgerConfig::default(), today(), Utc::now()).unwrap()
    }

    #[test]
    fn test_originate_derives_installment_and_dates() {
        let loan = loan(10_000, dec!(12), 12);

        assert_eq!(loan.monthly_installment, Money::from_minor(88_849));
        assert_eq!(loan.start_date, today());
        assert_eq!(loan.end_date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(loan.outstanding_balance, loan.principal);
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.annual_rate().as_decimal(), dec!(0.12));
    }

    #[test]
    fn test_explicit_start_date() {
        let start = NaiveDate::from_ymd_opt(2023, 8, 31).unwrap();
        let request = NewLoan::new(Uuid::new_v4(), Money::from_major(600), dec!(0), 6).starting(start);
        let loan = Loan::originate(&request, &LedgerConfig::default(), today(), Utc::now()).unwrap();

        assert_eq!(loan.start_date, start);
        assert_eq!(loan.end_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(loan.monthly_installment, Money::from_major(100));
    }

    #[test]
    fn test_invalid_terms_rejected() {
        let config = LedgerConfig::default();
        let client = Uuid::new_v4();
        let cases = vec![
            NewLoan::new(client, Money::ZERO, dec!(10), 12),
            NewLoan::new(client, Money::from_major(-100), dec!(10), 12),
            NewLoan::new(client, Money::from_major(100), dec!(10), 0),
            NewLoan::new(client, Money::from_major(100), dec!(-0.5), 12),
            NewLoan::new(client, Money::from_major(100), dec!(10), 601),
            NewLoan::new(client, Money::from_major(MAX_PRINCIPAL_MAJOR) + Money::CENT, dec!(10), 12),
            NewLoan::new(
                client,
                Money::from_str_exact("79000000000000000000000000000").unwrap(),
                dec!(12),
                12,
            ),
        ];

        for request in cases {
            let result = Loan::originate(&request, &config, today(), Utc::now());
            assert!(
                matches!(result, Err(LedgerError::InvalidLoanTerms { .. })),
                "expected invalid terms for {request:?}"
            );
        }
    }

    #[test]
    fn test_partial_payment_keeps_loan_active() {
        let mut loan = loan(1_000, dec!(10), 12);
        let change = loan.apply_payment(Money::from_major(300)).unwrap();

        assert_eq!(change.previous_balance, Money::from_major(1_000));
        assert_eq!(change.new_balance, Money::from_major(700));
        assert!(!change.settled());
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.amount_repaid(), Money::from_major(300));
    }

    #[test]
    fn test_full_payment_settles_then_rejects_more() {
        let mut loan = loan(500, dec!(5), 6);

        let change = loan.apply_payment(Money::from_major(500)).unwrap();
        assert!(change.settled());
        assert_eq!(loan.outstanding_balance, Money::ZERO);
        assert_eq!(loan.status, LoanStatus::Paid);

        let err = loan.apply_payment(Money::CENT).unwrap_err();
        assert!(matches!(err, LedgerError::InactiveLoan { loan_id } if loan_id == loan.id));
    }

    #[test]
    fn test_overpayment_rejected_without_mutation() {
        let mut loan = loan(500, dec!(5), 6);
        let before = loan.clone();

        let err = loan.apply_payment(Money::from_minor(50_001)).unwrap_err();
        assert!(matches!(err, LedgerError::ExceedsBalance { .. }));
        assert_eq!(loan, before);

        let err = loan.apply_payment(Money::ZERO).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPaymentAmount { .. }));
        assert_eq!(loan, before);
    }

    #[test]
    fn test_correct_payment_rederives_balance() {
        let mut loan = loan(1_000, dec!(0), 10);
        loan.apply_payment(Money::from_major(200)).unwrap();
        loan.apply_payment(Money::from_major(300)).unwrap();
        let total = Money::from_major(500);

        // 300 becomes 100
        let change = loan.correct_payment(total, Money::from_major(300), Money::from_major(100)).unwrap();
        assert_eq!(change.new_balance, Money::from_major(700));

        // 100 cannot grow past what the other payments leave
        let err = loan
            .correct_payment(Money::from_major(300), Money::from_major(100), Money::from_major(801))
            .unwrap_err();
        assert!(matches!(err, LedgerError::ExceedsBalance { balance, .. } if balance == Money::from_major(800)));
        assert_eq!(loan.outstanding_balance, Money::from_major(700));
    }

    #[test]
    fn test_remove_payment_reopens_paid_loan() {
        let mut loan = loan(400, dec!(0), 4);
        loan.apply_payment(Money::from_major(100)).unwrap();
        loan.apply_payment(Money::from_major(300)).unwrap();
        assert_eq!(loan.status, LoanStatus::Paid);

        let change = loan.remove_payment(Money::from_major(400), Money::from_major(300)).unwrap();
        assert!(change.reopened());
        assert_eq!(loan.outstanding_balance, Money::from_major(300));
        assert_eq!(loan.status, LoanStatus::Active);
    }

    #[test]
    fn test_maturity_status() {
        let loan = loan(1_000, dec!(10), 1);
        let end = loan.end_date;

        assert_eq!(loan.maturity_status(end + Duration::days(1), 7), MaturityStatus::Overdue);
        assert_eq!(loan.maturity_status(end - Duration::days(3), 7), MaturityStatus::DueSoon);
        assert_eq!(loan.maturity_status(end - Duration::days(7), 7), MaturityStatus::Current);
        assert_eq!(loan.days_overdue(end + Duration::days(5)), 5);
        assert_eq!(loan.days_overdue(end - Duration::days(2)), -2);
        assert!(loan.is_overdue(end + Duration::days(1)));
        assert!(!loan.is_overdue(end));
    }

    #[test]
    fn test_maturity_horizon_past_calendar_end_is_due_soon() {
        let loan = loan(1_000, dec!(10), 1);

        assert_eq!(loan.maturity_status(today(), u32::MAX), MaturityStatus::DueSoon);
        assert_eq!(
            loan.maturity_status(loan.end_date + Duration::days(1), u32::MAX),
            MaturityStatus::Overdue
        );
    }

    #[test]
    fn test_largest_principal_originates_with_schedule() {
        let request = NewLoan::new(Uuid::new_v4(), Money::from_major(MAX_PRINCIPAL_MAJOR), dec!(30), 600);
        let loan = Loan::originate(&request, &LedgerConfig::default(), today(), Utc::now()).unwrap();

        let schedule = loan.schedule().unwrap();
        assert_eq!(schedule.entries.len(), 600);
        assert!(schedule.total_payment > loan.principal);
    }
}
