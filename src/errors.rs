use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::LoanId;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid loan terms: {message}")]
    InvalidLoanTerms {
        message: String,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("payment exceeds outstanding balance: balance {balance}, requested {requested}")]
    ExceedsBalance {
        balance: Money,
        requested: Money,
    },

    #[error("loan {loan_id} is already paid")]
    InactiveLoan {
        loan_id: LoanId,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: Uuid,
    },

    #[error("constraint violation: {message}")]
    ConstraintViolation {
        message: String,
    },

    #[error("client {client_id} is inactive")]
    ClientInactive {
        client_id: Uuid,
    },

    #[error("invalid input: {message}")]
    InvalidInput {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("no data to export for {report}")]
    NoData {
        report: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv export error: {0}")]
    Export(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn client_not_found(id: Uuid) -> Self {
        LedgerError::NotFound { entity: "client", id }
    }

    pub fn loan_not_found(id: Uuid) -> Self {
        LedgerError::NotFound { entity: "loan", id }
    }

    pub fn payment_not_found(id: Uuid) -> Self {
        LedgerError::NotFound { entity: "payment", id }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
