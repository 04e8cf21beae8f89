use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{ClientId, LoanId, PaymentId};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // client events
    ClientRegistered {
        client_id: ClientId,
        national_id: String,
        timestamp: DateTime<Utc>,
    },
    ClientUpdated {
        client_id: ClientId,
        timestamp: DateTime<Utc>,
    },
    ClientDeactivated {
        client_id: ClientId,
        timestamp: DateTime<Utc>,
    },

    // loan events
    LoanOriginated {
        loan_id: LoanId,
        client_id: ClientId,
        principal: Money,
        monthly_installment: Money,
        term_months: u32,
        timestamp: DateTime<Utc>,
    },
    LoanSettled {
        loan_id: LoanId,
        final_payment: Money,
        timestamp: DateTime<Utc>,
    },
    LoanReopened {
        loan_id: LoanId,
        outstanding_balance: Money,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentApplied {
        payment_id: PaymentId,
        loan_id: LoanId,
        amount: Money,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentCorrected {
        payment_id: PaymentId,
        loan_id: LoanId,
        old_amount: Money,
        new_amount: Money,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentDeleted {
        payment_id: PaymentId,
        loan_id: LoanId,
        amount: Money,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<LedgerEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }
}
