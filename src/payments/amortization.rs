use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};

/// one period of an amortization schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub period: u32,
    pub due_date: NaiveDate,
    pub installment: Money,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub ending_balance: Money,
}

/// amortization schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub start_date: NaiveDate,
    pub installment: Money,
    pub entries: Vec<ScheduleEntry>,
    pub total_interest: Money,
    pub total_payment: Money,
}

impl AmortizationSchedule {
    /// generate the full schedule for fixed loan terms
    pub fn generate(
        principal: Money,
        annual_rate: Rate,
        term_months: u32,
        installment: Money,
        start_date: NaiveDate,
    ) -> Result<Self> {
        let entries =
            AmortizationCalculator::new(annual_rate).schedule(principal, term_months, installment, start_date)?;

        let total_interest = Money::checked_sum(entries.iter().map(|e| e.interest_portion))
            .ok_or_else(|| overflow("schedule interest total"))?;
        let total_payment = Money::checked_sum(entries.iter().map(|e| e.installment))
            .ok_or_else(|| overflow("schedule payment total"))?;

        Ok(Self {
            principal,
            annual_rate,
            term_months,
            start_date,
            installment,
            entries,
            total_interest,
            total_payment,
        })
    }

    /// get entry for a 1-indexed period
    pub fn get_period(&self, period: u32) -> Option<&ScheduleEntry> {
        period
            .checked_sub(1)
            .and_then(|index| self.entries.get(index as usize))
    }

    /// remaining balance after a period; the principal before period 1
    pub fn balance_after(&self, period: u32) -> Money {
        self.get_period(period)
            .map(|e| e.ending_balance)
            .unwrap_or(self.principal)
    }

    /// sum of the principal portions
    pub fn total_principal(&self) -> Money {
        self.entries.iter().map(|e| e.principal_portion).sum()
    }
}

/// equal-installment amortization at a fixed annual rate
pub struct AmortizationCalculator {
    monthly_rate: Decimal,
}

impl AmortizationCalculator {
    pub fn new(annual_rate: Rate) -> Self {
        Self {
            monthly_rate: annual_rate.monthly_rate().as_decimal(),
        }
    }

    /// fixed monthly installment for a principal over `term_months`
    ///
    /// Terms are not validated here. A zero rate takes the straight-line
    /// branch instead of the closed form, which divides by zero at r = 0.
    pub fn installment(&self, principal: Money, term_months: u32) -> Result<Money> {
        if term_months == 0 {
            return Err(LedgerError::CalculationError {
                message: "installment over zero months".to_string(),
            });
        }

        if self.monthly_rate.is_zero() {
            return Ok(principal / Decimal::from(term_months));
        }

        // M = P * r * (1 + r)^n / ((1 + r)^n - 1)
        let r = self.monthly_rate;
        let compound = compound_factor(r, term_months)?;

        let numerator = principal
            .as_decimal()
            .checked_mul(r)
            .and_then(|v| v.checked_mul(compound))
            .ok_or_else(|| overflow("installment numerator"))?;
        let denominator = compound - Decimal::ONE;

        let installment = numerator
            .checked_div(denominator)
            .ok_or_else(|| overflow("installment division"))?;

        Ok(Money::from_decimal(installment))
    }

    /// per-period breakdown for the given installment
    pub fn schedule(
        &self,
        principal: Money,
        term_months: u32,
        installment: Money,
        start_date: NaiveDate,
    ) -> Result<Vec<ScheduleEntry>> {
        let mut entries = Vec::with_capacity(term_months as usize);
        let mut balance = principal;

        for period in 1..=term_months {
            let due_date = add_months(start_date, period)?;
            let interest_portion = balance
                .as_decimal()
                .checked_mul(self.monthly_rate)
                .map(Money::from_decimal)
                .ok_or_else(|| overflow("period interest"))?;
            let principal_portion = installment
                .checked_sub(interest_portion)
                .ok_or_else(|| overflow("period principal"))?;

            balance = balance
                .checked_sub(principal_portion)
                .ok_or_else(|| overflow("period balance"))?;

            entries.push(ScheduleEntry {
                period,
                due_date,
                installment,
                principal_portion,
                interest_portion,
                ending_balance: balance.floor_zero(),
            });
        }

        Ok(entries)
    }
}

/// installment for a principal, annual rate and term
pub fn calculate_installment(principal: Money, annual_rate: Rate, term_months: u32) -> Result<Money> {
    AmortizationCalculator::new(annual_rate).installment(principal, term_months)
}

/// (1 + r)^n by repeated multiplication
fn compound_factor(r: Decimal, n: u32) -> Result<Decimal> {
    let base = Decimal::ONE + r;
    let mut compound = Decimal::ONE;
    for _ in 0..n {
        compound = compound
            .checked_mul(base)
            .ok_or_else(|| overflow("compound factor"))?;
    }
    Ok(compound)
}

fn overflow(stage: &str) -> LedgerError {
    LedgerError::CalculationError {
        message: format!("decimal overflow computing {stage}"),
    }
}

/// add calendar months, clamping to the last day of the target month
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LedgerError::InvalidDate {
            message: format!("{date} plus {months} months is out of range"),
        })
}
