//! storage seam for clients, loans and payments
//!
//! Every method is one unit of work. Payment mutations validate against the
//! owning loan and commit the payment row together with the loan's balance
//! and status, or commit nothing.

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::client::{Client, ClientUpdate};
use crate::errors::Result;
use crate::loan::{BalanceChange, Loan};
use crate::payments::{Payment, PaymentUpdate};
use crate::types::{ClientId, ClientStatus, LoanId, PaymentId};

pub use memory::{InMemoryRepository, LedgerSnapshot};

/// a committed client change with the status it replaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRevision {
    pub previous_status: ClientStatus,
    pub client: Client,
}

impl ClientRevision {
    /// true when this change moved the client from active to inactive
    pub fn deactivated(&self) -> bool {
        self.previous_status == ClientStatus::Active && self.client.status == ClientStatus::Inactive
    }
}

/// a payment mutation and the loan state it committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPosting {
    pub payment: Payment,
    pub loan: Loan,
    pub change: BalanceChange,
}

/// a corrected payment with its prior version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCorrection {
    pub previous: Payment,
    pub payment: Payment,
    pub loan: Loan,
    pub change: BalanceChange,
}

pub trait LedgerRepository: Send + Sync {
    /// insert a client; fails on a duplicate national id
    fn insert_client(&self, client: Client) -> Result<Client>;

    fn get_client(&self, id: ClientId) -> Result<Client>;

    /// replace a client's editable fields; national id stays unique
    fn update_client(&self, id: ClientId, update: ClientUpdate) -> Result<ClientRevision>;

    /// change only the status, leaving every other field as stored
    fn set_client_status(&self, id: ClientId, status: ClientStatus) -> Result<ClientRevision>;

    fn list_clients(&self) -> Result<Vec<Client>>;

    /// insert a loan for an existing, active client
    fn insert_loan(&self, loan: Loan) -> Result<Loan>;

    fn get_loan(&self, id: LoanId) -> Result<Loan>;

    fn list_loans(&self) -> Result<Vec<Loan>>;

    /// record a payment and apply it to its loan atomically
    fn apply_payment(&self, payment: Payment) -> Result<PaymentPosting>;

    fn get_payment(&self, id: PaymentId) -> Result<Payment>;

    fn list_payments(&self) -> Result<Vec<Payment>>;

    /// correct a payment and re-derive its loan's balance atomically
    fn update_payment(&self, id: PaymentId, update: PaymentUpdate) -> Result<PaymentCorrection>;

    /// delete a payment and re-derive its loan's balance atomically
    fn delete_payment(&self, id: PaymentId) -> Result<PaymentPosting>;
}
