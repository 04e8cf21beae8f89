//! joined read models for listing endpoints
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::decimal::Money;
use crate::loan::Loan;
use crate::payments::{total_paid_for, AmortizationSchedule, Payment, ScheduleEntry};
use crate::types::{ClientId, LoanId, LoanStatus, PaymentId, PaymentKind};

/// identity fields copied onto joined rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub client_id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl From<&Client> for ClientIdentity {
    fn from(client: &Client) -> Self {
        Self {
            client_id: client.id,
            first_name: client.first_name.clone(),
            last_name: client.last_name.clone(),
            national_id: client.national_id.clone(),
            phone: client.phone.clone(),
            email: client.email.clone(),
        }
    }
}

/// loan with its client and payment total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub client: ClientIdentity,
    pub principal: Money,
    pub annual_rate_percent: Decimal,
    pub term_months: u32,
    pub monthly_installment: Money,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub outstanding_balance: Money,
    pub status: LoanStatus,
    pub total_paid: Money,
}

impl LoanView {
    pub fn new(loan: &Loan, client: &Client, payments: &[Payment]) -> Self {
        Self {
            id: loan.id,
            client: ClientIdentity::from(client),
            principal: loan.principal,
            annual_rate_percent: loan.annual_rate_percent,
            term_months: loan.term_months,
            monthly_installment: loan.monthly_installment,
            start_date: loan.start_date,
            end_date: loan.end_date,
            outstanding_balance: loan.outstanding_balance,
            status: loan.status,
            total_paid: total_paid_for(loan.id, payments),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// payment with its loan's client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentView {
    pub id: PaymentId,
    pub loan_id: LoanId,
    pub client: ClientIdentity,
    pub amount: Money,
    pub kind: PaymentKind,
    pub description: Option<String>,
    pub applied_at: DateTime<Utc>,
}

impl PaymentView {
    pub fn new(payment: &Payment, client: &Client) -> Self {
        Self {
            id: payment.id,
            loan_id: payment.loan_id,
            client: ClientIdentity::from(client),
            amount: payment.amount,
            kind: payment.kind,
            description: payment.description.clone(),
            applied_at: payment.applied_at,
        }
    }
}

/// client with loan counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientView {
    #[serde(flatten)]
    pub client: Client,
    pub total_loans: usize,
    pub active_loans: usize,
}

impl ClientView {
    pub fn new(client: &Client, loans: &[Loan]) -> Self {
        let owned = loans.iter().filter(|l| l.client_id == client.id);
        let (total_loans, active_loans) =
            owned.fold((0, 0), |(total, active), loan| (total + 1, active + loan.is_active() as usize));

        Self {
            client: client.clone(),
            total_loans,
            active_loans,
        }
    }
}

/// loan together with its amortization table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanScheduleView {
    pub loan: LoanView,
    pub total_interest: Money,
    pub total_payment: Money,
    pub entries: Vec<ScheduleEntry>,
}

impl LoanScheduleView {
    pub fn new(loan: LoanView, schedule: AmortizationSchedule) -> Self {
        Self {
            loan,
            total_interest: schedule.total_interest,
            total_payment: schedule.total_payment,
            entries: schedule.entries,
        }
    }
}

/// lookup tables for joining rows in memory
pub struct Directory<'a> {
    clients: HashMap<ClientId, &'a Client>,
    loans: HashMap<LoanId, &'a Loan>,
}

impl<'a> Directory<'a> {
    pub fn new(clients: &'a [Client], loans: &'a [Loan]) -> Self {
        Self {
            clients: clients.iter().map(|c| (c.id, c)).collect(),
            loans: loans.iter().map(|l| (l.id, l)).collect(),
        }
    }

    pub fn client(&self, id: ClientId) -> Option<&'a Client> {
        self.clients.get(&id).copied()
    }

    pub fn loan(&self, id: LoanId) -> Option<&'a Loan> {
        self.loans.get(&id).copied()
    }

    /// client owning a loan
    pub fn borrower(&self, loan_id: LoanId) -> Option<&'a Client> {
        self.loan(loan_id).and_then(|loan| self.client(loan.client_id))
    }

    /// join loans to their clients; loans without a client are skipped
    pub fn loan_views<'b>(&self, loans: impl IntoIterator<Item = &'b Loan>, payments: &[Payment]) -> Vec<LoanView> {
        loans
            .into_iter()
            .filter_map(|loan| self.client(loan.client_id).map(|c| LoanView::new(loan, c, payments)))
            .collect()
    }

    /// join payments to the client of their loan
    pub fn payment_views<'b>(&self, payments: impl IntoIterator<Item = &'b Payment>) -> Vec<PaymentView> {
        payments
            .into_iter()
            .filter_map(|p| self.borrower(p.loan_id).map(|c| PaymentView::new(p, c)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NewClient;
    use crate::config::LedgerConfig;
    use crate::loan::NewLoan;
    use crate::payments::NewPayment;
    use rust_decimal_macros::dec;

    #[test]
    fn test_joined_views() {
        let client = Client::register(NewClient::new("Ana", "Torres", "111").email("ana@example.com"), Utc::now())
            .unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let active = Loan::originate(
            &NewLoan::new(client.id, Money::from_major(1_000), dec!(10), 12),
            &LedgerConfig::default(),
            today,
            Utc::now(),
        )
        .unwrap();
        let mut paid = active.clone();
        paid.id = uuid::Uuid::new_v4();
        paid.apply_payment(paid.principal).unwrap();

        let payments = vec![
            Payment::new(NewPayment::new(active.id, Money::from_major(100)), PaymentKind::Installment, Utc::now()),
            Payment::new(NewPayment::new(paid.id, Money::from_major(1_000)), PaymentKind::Settlement, Utc::now()),
        ];
        let clients = vec![client.clone()];
        let loans = vec![active.clone(), paid];
        let directory = Directory::new(&clients, &loans);

        let views = directory.loan_views(&loans, &payments);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].total_paid, Money::from_major(100));
        assert_eq!(views[0].client.national_id, "111");

        let payment_views = directory.payment_views(&payments);
        assert_eq!(payment_views[1].client.first_name, "Ana");

        let client_view = ClientView::new(&client, &loans);
        assert_eq!(client_view.total_loans, 2);
        assert_eq!(client_view.active_loans, 1);

        let json = serde_json::to_value(&client_view).unwrap();
        assert_eq!(json["national_id"], "111");
        assert_eq!(json["total_loans"], 2);
    }
}
