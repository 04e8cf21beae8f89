pub mod client;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod loan;
pub mod payments;
pub mod reports;
pub mod repository;
pub mod service;
pub mod types;
pub mod views;

// re-export key types
pub use client::{Client, ClientUpdate, NewClient};
pub use config::LedgerConfig;
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{EventStore, LedgerEvent};
pub use loan::{BalanceChange, Loan, NewLoan};
pub use payments::{
    calculate_installment, AmortizationCalculator, AmortizationSchedule, NewPayment, Payment,
    PaymentReceipt, PaymentUpdate, ScheduleEntry,
};
pub use reports::{ExportKind, LedgerData, LoanFilter, PaymentFilter};
pub use repository::{ClientRevision, InMemoryRepository, LedgerRepository, LedgerSnapshot};
pub use service::LedgerService;
pub use types::{
    ClientId, ClientStatus, DateRange, LoanId, LoanStatus, MaturityStatus, PaymentId,
    PaymentKind, ReportPeriod,
};
pub use views::{ClientView, LoanScheduleView, LoanView, PaymentView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
