use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::client::{Client, ClientUpdate};
use crate::errors::{LedgerError, Result};
use crate::decimal::Money;
use crate::loan::{Loan, MAX_PRINCIPAL_MAJOR};
use crate::payments::{Payment, PaymentUpdate};
use crate::types::{ClientId, ClientStatus, LoanId, LoanStatus, PaymentId};

use super::{ClientRevision, LedgerRepository, PaymentCorrection, PaymentPosting};

#[derive(Debug, Default)]
struct LedgerTables {
    clients: HashMap<ClientId, Client>,
    loans: HashMap<LoanId, Loan>,
    payments: HashMap<PaymentId, Payment>,
}

impl LedgerTables {
    fn national_id_taken(&self, national_id: &str, except: Option<ClientId>) -> bool {
        self.clients
            .values()
            .any(|c| c.national_id == national_id && Some(c.id) != except)
    }

    fn total_paid(&self, loan_id: LoanId) -> Money {
        self.payments
            .values()
            .filter(|p| p.loan_id == loan_id)
            .map(|p| p.amount)
            .sum()
    }
}

/// thread-safe in-process store
///
/// A single write lock spans each mutation, so two payments against the
/// same loan are serialized and never read the same balance.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tables: RwLock<LedgerTables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// copy of every row
    pub fn snapshot(&self, captured_at: DateTime<Utc>) -> LedgerSnapshot {
        let tables = self.tables.read();

        let mut clients: Vec<Client> = tables.clients.values().cloned().collect();
        clients.sort_by_key(|c| (c.registered_at, c.id));
        let mut loans: Vec<Loan> = tables.loans.values().cloned().collect();
        loans.sort_by_key(|l| (l.created_at, l.id));
        let mut payments: Vec<Payment> = tables.payments.values().cloned().collect();
        payments.sort_by_key(|p| (p.applied_at, p.id));

        LedgerSnapshot {
            captured_at,
            clients,
            loans,
            payments,
        }
    }

    /// rebuild a store from a snapshot after checking it is consistent
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self> {
        snapshot.verify()?;

        let tables = LedgerTables {
            clients: snapshot.clients.into_iter().map(|c| (c.id, c)).collect(),
            loans: snapshot.loans.into_iter().map(|l| (l.id, l)).collect(),
            payments: snapshot.payments.into_iter().map(|p| (p.id, p)).collect(),
        };

        Ok(Self {
            tables: RwLock::new(tables),
        })
    }
}

impl LedgerRepository for InMemoryRepository {
    fn insert_client(&self, client: Client) -> Result<Client> {
        let mut tables = self.tables.write();

        if tables.national_id_taken(&client.national_id, None) {
            return Err(LedgerError::ConstraintViolation {
                message: format!("national id {} is already registered", client.national_id),
            });
        }

        tables.clients.insert(client.id, client.clone());
        Ok(client)
    }

    fn get_client(&self, id: ClientId) -> Result<Client> {
        self.tables
            .read()
            .clients
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::client_not_found(id))
    }

    fn update_client(&self, id: ClientId, update: ClientUpdate) -> Result<ClientRevision> {
        let mut tables = self.tables.write();

        let mut client = tables
            .clients
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::client_not_found(id))?;
        let previous_status = client.status;

        client.apply_update(update)?;

        if tables.national_id_taken(&client.national_id, Some(id)) {
            return Err(LedgerError::ConstraintViolation {
                message: format!("national id {} is already registered", client.national_id),
            });
        }

        tables.clients.insert(id, client.clone());
        Ok(ClientRevision {
            previous_status,
            client,
        })
    }

    fn set_client_status(&self, id: ClientId, status: ClientStatus) -> Result<ClientRevision> {
        let mut tables = self.tables.write();

        let client = tables
            .clients
            .get_mut(&id)
            .ok_or_else(|| LedgerError::client_not_found(id))?;
        let previous_status = std::mem::replace(&mut client.status, status);

        Ok(ClientRevision {
            previous_status,
            client: client.clone(),
        })
    }

    fn list_clients(&self) -> Result<Vec<Client>> {
        Ok(self.tables.read().clients.values().cloned().collect())
    }

    fn insert_loan(&self, loan: Loan) -> Result<Loan> {
        let mut tables = self.tables.write();

        let client = tables
            .clients
            .get(&loan.client_id)
            .ok_or_else(|| LedgerError::client_not_found(loan.client_id))?;

        if !client.is_active() {
            return Err(LedgerError::ClientInactive {
                client_id: client.id,
            });
        }

        tables.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    fn get_loan(&self, id: LoanId) -> Result<Loan> {
        self.tables
            .read()
            .loans
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::loan_not_found(id))
    }

    fn list_loans(&self) -> Result<Vec<Loan>> {
        Ok(self.tables.read().loans.values().cloned().collect())
    }

    fn apply_payment(&self, payment: Payment) -> Result<PaymentPosting> {
        let mut tables = self.tables.write();

        let mut loan = tables
            .loans
            .get(&payment.loan_id)
            .cloned()
            .ok_or_else(|| LedgerError::loan_not_found(payment.loan_id))?;

        let change = loan.apply_payment(payment.amount)?;

        tables.payments.insert(payment.id, payment.clone());
        tables.loans.insert(loan.id, loan.clone());

        Ok(PaymentPosting {
            payment,
            loan,
            change,
        })
    }

    fn get_payment(&self, id: PaymentId) -> Result<Payment> {
        self.tables
            .read()
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::payment_not_found(id))
    }

    fn list_payments(&self) -> Result<Vec<Payment>> {
        Ok(self.tables.read().payments.values().cloned().collect())
    }

    fn update_payment(&self, id: PaymentId, update: PaymentUpdate) -> Result<PaymentCorrection> {
        let mut tables = self.tables.write();

        let previous = tables
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::payment_not_found(id))?;

        let mut loan = tables
            .loans
            .get(&previous.loan_id)
            .cloned()
            .ok_or_else(|| LedgerError::loan_not_found(previous.loan_id))?;

        let total_paid = tables.total_paid(loan.id);
        let change = loan.correct_payment(total_paid, previous.amount, update.amount)?;

        let payment = Payment {
            amount: update.amount,
            kind: update.kind,
            description: update.description,
            ..previous.clone()
        };

        tables.payments.insert(id, payment.clone());
        tables.loans.insert(loan.id, loan.clone());

        Ok(PaymentCorrection {
            previous,
            payment,
            loan,
            change,
        })
    }

    fn delete_payment(&self, id: PaymentId) -> Result<PaymentPosting> {
        let mut tables = self.tables.write();

        let payment = tables
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::payment_not_found(id))?;

        let mut loan = tables
            .loans
            .get(&payment.loan_id)
            .cloned()
            .ok_or_else(|| LedgerError::loan_not_found(payment.loan_id))?;

        let total_paid = tables.total_paid(loan.id);
        let change = loan.remove_payment(total_paid, payment.amount)?;

        tables.payments.remove(&id);
        tables.loans.insert(loan.id, loan.clone());

        Ok(PaymentPosting {
            payment,
            loan,
            change,
        })
    }
}

/// serializable copy of the whole store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub captured_at: DateTime<Utc>,
    pub clients: Vec<Client>,
    pub loans: Vec<Loan>,
    pub payments: Vec<Payment>,
}

impl LedgerSnapshot {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// the rules every mutation keeps
    ///
    /// Ids and national ids are unique and references resolve. Principals
    /// are within bounds and payments are positive. Every balance equals
    /// principal minus its payments, and a loan is paid exactly when that
    /// balance is zero.
    pub fn verify(&self) -> Result<()> {
        let mut client_ids = HashSet::new();
        let mut national_ids = HashSet::new();
        for client in &self.clients {
            if !client_ids.insert(client.id) {
                return Err(inconsistent(format!("duplicate client id {} in snapshot", client.id)));
            }
            if !national_ids.insert(client.national_id.as_str()) {
                return Err(inconsistent(format!(
                    "duplicate national id {} in snapshot",
                    client.national_id
                )));
            }
        }

        let mut payment_ids = HashSet::new();
        for payment in &self.payments {
            if !payment_ids.insert(payment.id) {
                return Err(inconsistent(format!("duplicate payment id {} in snapshot", payment.id)));
            }
            if !payment.amount.is_positive() {
                return Err(inconsistent(format!(
                    "payment {} has non-positive amount {}",
                    payment.id, payment.amount
                )));
            }
            if !self.loans.iter().any(|l| l.id == payment.loan_id) {
                return Err(inconsistent(format!(
                    "payment {} references unknown loan {}",
                    payment.id, payment.loan_id
                )));
            }
        }

        let mut loan_ids = HashSet::new();
        for loan in &self.loans {
            if !loan_ids.insert(loan.id) {
                return Err(inconsistent(format!("duplicate loan id {} in snapshot", loan.id)));
            }
            if !client_ids.contains(&loan.client_id) {
                return Err(inconsistent(format!(
                    "loan {} references unknown client {}",
                    loan.id, loan.client_id
                )));
            }
            if !loan.principal.is_positive() || loan.principal > Money::from_major(MAX_PRINCIPAL_MAJOR) {
                return Err(inconsistent(format!(
                    "loan {} has out-of-range principal {}",
                    loan.id, loan.principal
                )));
            }

            let expected = Money::checked_sum(
                self.payments
                    .iter()
                    .filter(|p| p.loan_id == loan.id)
                    .map(|p| p.amount),
            )
            .and_then(|paid| loan.principal.checked_sub(paid))
            .filter(|balance| !balance.is_negative());
            if expected != Some(loan.outstanding_balance) {
                return Err(inconsistent(format!(
                    "loan {} balance {} does not match its payments",
                    loan.id, loan.outstanding_balance
                )));
            }

            let status = if loan.outstanding_balance.is_zero() {
                LoanStatus::Paid
            } else {
                LoanStatus::Active
            };
            if loan.status != status {
                return Err(inconsistent(format!(
                    "loan {} is {:?} with balance {}",
                    loan.id, loan.status, loan.outstanding_balance
                )));
            }
        }

        Ok(())
    }
}

fn inconsistent(message: String) -> LedgerError {
    LedgerError::ConstraintViolation { message }
}
