//! Ledger service: every client, loan, payment and report operation.
//!
//! The service owns a [`LedgerRepository`], the [`LedgerConfig`] and the
//! time provider. "Today" always comes from the time provider so tests can
//! pin or advance the clock.

use std::cmp::Reverse;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::client::{Client, ClientUpdate, NewClient};
use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::Result;
use crate::events::{EventStore, LedgerEvent};
use crate::loan::{BalanceChange, Loan, NewLoan};
use crate::payments::{NewPayment, Payment, PaymentReceipt, PaymentUpdate};
use crate::reports::{
    self, CashFlowRow, ClientReportRow, DelinquencyRow, ExportKind, LedgerData, LoanFilter,
    PaymentFilter, PaymentSummaryRow, PerformanceReport, Statistics, TopClientRow,
};
use crate::repository::{InMemoryRepository, LedgerRepository};
use crate::types::{ClientId, ClientStatus, DateRange, LoanId, PaymentId, ReportPeriod};
use crate::views::{ClientView, LoanScheduleView, LoanView, PaymentView};

pub struct LedgerService<R: LedgerRepository> {
    repository: R,
    config: LedgerConfig,
    time: SafeTimeProvider,
    /// Held by every mutation from before its repository call until its
    /// events are recorded, so events appear in commit order.
    events: Mutex<EventStore>,
}

impl LedgerService<InMemoryRepository> {
    /// service over an empty in-memory store
    pub fn in_memory(config: LedgerConfig, time: SafeTimeProvider) -> Result<Self> {
        Self::new(InMemoryRepository::new(), config, time)
    }
}

impl<R: LedgerRepository> LedgerService<R> {
    pub fn new(repository: R, config: LedgerConfig, time: SafeTimeProvider) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            repository,
            config,
            time,
            events: Mutex::new(EventStore::new()),
        })
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn time_provider(&self) -> &SafeTimeProvider {
        &self.time
    }

    pub fn today(&self) -> NaiveDate {
        self.time.now().date_naive()
    }

    /// drain the events recorded since the last call
    pub fn take_events(&self) -> Vec<LedgerEvent> {
        self.events.lock().take_events()
    }

    fn data(&self) -> Result<LedgerData> {
        LedgerData::load(&self.repository)
    }

    /// LoanSettled / LoanReopened for a balance change
    fn emit_transition(
        &self,
        events: &mut EventStore,
        loan: &Loan,
        change: &BalanceChange,
        payment_amount: Money,
    ) {
        let timestamp = self.time.now();
        if change.settled() {
            info!(loan_id = %loan.id, "loan settled");
            events.emit(LedgerEvent::LoanSettled {
                loan_id: loan.id,
                final_payment: payment_amount,
                timestamp,
            });
        } else if change.reopened() {
            info!(loan_id = %loan.id, balance = %loan.outstanding_balance, "loan reopened");
            events.emit(LedgerEvent::LoanReopened {
                loan_id: loan.id,
                outstanding_balance: loan.outstanding_balance,
                timestamp,
            });
        }
    }

    // clients

    #[instrument(name = "ledger.register_client", skip(self), err)]
    pub fn register_client(&self, request: NewClient) -> Result<Client> {
        let client = Client::register(request, self.time.now())?;
        let mut events = self.events.lock();
        let client = self.repository.insert_client(client)?;

        info!(client_id = %client.id, "client registered");
        events.emit(LedgerEvent::ClientRegistered {
            client_id: client.id,
            national_id: client.national_id.clone(),
            timestamp: client.registered_at,
        });
        Ok(client)
    }

    #[instrument(name = "ledger.client", skip(self), err)]
    pub fn client(&self, id: ClientId) -> Result<ClientView> {
        let client = self.repository.get_client(id)?;
        let loans = self.repository.list_loans()?;
        Ok(ClientView::new(&client, &loans))
    }

    #[instrument(name = "ledger.update_client", skip(self), err)]
    pub fn update_client(&self, id: ClientId, update: ClientUpdate) -> Result<Client> {
        let mut events = self.events.lock();
        let revision = self.repository.update_client(id, update)?;

        info!(client_id = %id, "client updated");
        let timestamp = self.time.now();
        events.emit(LedgerEvent::ClientUpdated { client_id: id, timestamp });
        if revision.deactivated() {
            events.emit(LedgerEvent::ClientDeactivated { client_id: id, timestamp });
        }
        Ok(revision.client)
    }

    /// soft delete; a client that is already inactive is returned unchanged
    #[instrument(name = "ledger.deactivate_client", skip(self), err)]
    pub fn deactivate_client(&self, id: ClientId) -> Result<Client> {
        let mut events = self.events.lock();
        let revision = self.repository.set_client_status(id, ClientStatus::Inactive)?;

        if revision.deactivated() {
            info!(client_id = %id, "client deactivated");
            events.emit(LedgerEvent::ClientDeactivated {
                client_id: id,
                timestamp: self.time.now(),
            });
        }
        Ok(revision.client)
    }

    /// every client with loan counts, newest registration first
    #[instrument(name = "ledger.clients", skip(self), err)]
    pub fn clients(&self) -> Result<Vec<ClientView>> {
        let data = self.data()?;
        let mut views: Vec<ClientView> = data.clients.iter().map(|c| ClientView::new(c, &data.loans)).collect();
        views.sort_by_key(|v| Reverse(v.client.registered_at));
        Ok(views)
    }

    /// match on names or national id, ordered by first then last name
    #[instrument(name = "ledger.search_clients", skip(self), err)]
    pub fn search_clients(&self, term: &str) -> Result<Vec<ClientView>> {
        let data = self.data()?;
        let mut views: Vec<ClientView> = data
            .clients
            .iter()
            .filter(|c| c.matches(term))
            .map(|c| ClientView::new(c, &data.loans))
            .collect();
        views.sort_by(|a, b| {
            a.client
                .first_name
                .cmp(&b.client.first_name)
                .then_with(|| a.client.last_name.cmp(&b.client.last_name))
        });
        debug!(matches = views.len(), "client search");
        Ok(views)
    }

    // loans

    #[instrument(name = "ledger.originate_loan", skip(self), err)]
    pub fn originate_loan(&self, request: NewLoan) -> Result<LoanView> {
        let now = self.time.now();
        let loan = Loan::originate(&request, &self.config, now.date_naive(), now)?;
        let mut events = self.events.lock();
        let loan = self.repository.insert_loan(loan)?;
        let client = self.repository.get_client(loan.client_id)?;

        info!(
            loan_id = %loan.id,
            client_id = %loan.client_id,
            principal = %loan.principal,
            installment = %loan.monthly_installment,
            "loan originated"
        );
        events.emit(LedgerEvent::LoanOriginated {
            loan_id: loan.id,
            client_id: loan.client_id,
            principal: loan.principal,
            monthly_installment: loan.monthly_installment,
            term_months: loan.term_months,
            timestamp: now,
        });
        Ok(LoanView::new(&loan, &client, &[]))
    }

    #[instrument(name = "ledger.loan", skip(self), err)]
    pub fn loan(&self, id: LoanId) -> Result<LoanView> {
        let loan = self.repository.get_loan(id)?;
        let client = self.repository.get_client(loan.client_id)?;
        let payments = self.repository.list_payments()?;
        Ok(LoanView::new(&loan, &client, &payments))
    }

    /// every loan, newest start date first
    #[instrument(name = "ledger.loans", skip(self), err)]
    pub fn loans(&self) -> Result<Vec<LoanView>> {
        Ok(reports::loan_report(&self.data()?, &LoanFilter::default()))
    }

    #[instrument(name = "ledger.loans_for_client", skip(self), err)]
    pub fn loans_for_client(&self, client_id: ClientId) -> Result<Vec<LoanView>> {
        self.repository.get_client(client_id)?;
        let mut views = self.loans()?;
        views.retain(|v| v.client.client_id == client_id);
        Ok(views)
    }

    /// active loans past their end date, oldest end date first
    #[instrument(name = "ledger.overdue_loans", skip(self), err)]
    pub fn overdue_loans(&self) -> Result<Vec<LoanView>> {
        let data = self.data()?;
        let today = self.today();
        let mut views = data
            .directory()
            .loan_views(data.loans.iter().filter(|l| l.is_overdue(today)), &data.payments);
        views.sort_by_key(|v| v.end_date);
        Ok(views)
    }

    #[instrument(name = "ledger.amortization_schedule", skip(self), err)]
    pub fn amortization_schedule(&self, loan_id: LoanId) -> Result<LoanScheduleView> {
        let loan = self.repository.get_loan(loan_id)?;
        let schedule = loan.schedule()?;
        Ok(LoanScheduleView::new(self.loan(loan_id)?, schedule))
    }

    // payments

    /// record a payment and apply it to the loan balance in one step
    #[instrument(name = "ledger.record_payment", skip(self), err)]
    pub fn record_payment(&self, request: NewPayment) -> Result<PaymentReceipt> {
        let kind = request.kind.unwrap_or(self.config.default_payment_kind);
        let payment = Payment::new(request, kind, self.time.now());
        let mut events = self.events.lock();
        let posting = self.repository.apply_payment(payment)?;

        info!(
            payment_id = %posting.payment.id,
            loan_id = %posting.loan.id,
            amount = %posting.payment.amount,
            balance = %posting.loan.outstanding_balance,
            "payment applied"
        );
        events.emit(LedgerEvent::PaymentApplied {
            payment_id: posting.payment.id,
            loan_id: posting.loan.id,
            amount: posting.payment.amount,
            new_balance: posting.loan.outstanding_balance,
            timestamp: posting.payment.applied_at,
        });
        self.emit_transition(&mut events, &posting.loan, &posting.change, posting.payment.amount);

        Ok(PaymentReceipt {
            payment: posting.payment,
            loan: posting.loan,
        })
    }

    #[instrument(name = "ledger.payment", skip(self), err)]
    pub fn payment(&self, id: PaymentId) -> Result<PaymentView> {
        let payment = self.repository.get_payment(id)?;
        let loan = self.repository.get_loan(payment.loan_id)?;
        let client = self.repository.get_client(loan.client_id)?;
        Ok(PaymentView::new(&payment, &client))
    }

    /// every payment, newest first
    #[instrument(name = "ledger.payments", skip(self), err)]
    pub fn payments(&self) -> Result<Vec<PaymentView>> {
        Ok(reports::payment_report(&self.data()?, &PaymentFilter::default()))
    }

    #[instrument(name = "ledger.payments_for_loan", skip(self), err)]
    pub fn payments_for_loan(&self, loan_id: LoanId) -> Result<Vec<PaymentView>> {
        self.repository.get_loan(loan_id)?;
        let mut views = self.payments()?;
        views.retain(|v| v.loan_id == loan_id);
        Ok(views)
    }

    /// payments applied on one calendar day
    #[instrument(name = "ledger.payments_on", skip(self), err)]
    pub fn payments_on(&self, date: NaiveDate) -> Result<Vec<PaymentView>> {
        let filter = PaymentFilter {
            applied: DateRange::between(date, date),
            kind: None,
        };
        Ok(reports::payment_report(&self.data()?, &filter))
    }

    /// correct a recorded payment; the loan balance is re-derived from all payments
    #[instrument(name = "ledger.update_payment", skip(self), err)]
    pub fn update_payment(&self, id: PaymentId, update: PaymentUpdate) -> Result<PaymentReceipt> {
        let mut events = self.events.lock();
        let correction = self.repository.update_payment(id, update)?;

        info!(
            payment_id = %id,
            old_amount = %correction.previous.amount,
            new_amount = %correction.payment.amount,
            balance = %correction.loan.outstanding_balance,
            "payment corrected"
        );
        events.emit(LedgerEvent::PaymentCorrected {
            payment_id: id,
            loan_id: correction.loan.id,
            old_amount: correction.previous.amount,
            new_amount: correction.payment.amount,
            new_balance: correction.loan.outstanding_balance,
            timestamp: self.time.now(),
        });
        self.emit_transition(&mut events, &correction.loan, &correction.change, correction.payment.amount);

        Ok(PaymentReceipt {
            payment: correction.payment,
            loan: correction.loan,
        })
    }

    /// remove a payment; returns the deleted row and the loan after re-derivation
    #[instrument(name = "ledger.delete_payment", skip(self), err)]
    pub fn delete_payment(&self, id: PaymentId) -> Result<PaymentReceipt> {
        let mut events = self.events.lock();
        let posting = self.repository.delete_payment(id)?;

        info!(
            payment_id = %id,
            amount = %posting.payment.amount,
            balance = %posting.loan.outstanding_balance,
            "payment deleted"
        );
        events.emit(LedgerEvent::PaymentDeleted {
            payment_id: id,
            loan_id: posting.loan.id,
            amount: posting.payment.amount,
            new_balance: posting.loan.outstanding_balance,
            timestamp: self.time.now(),
        });
        self.emit_transition(&mut events, &posting.loan, &posting.change, posting.payment.amount);

        Ok(PaymentReceipt {
            payment: posting.payment,
            loan: posting.loan,
        })
    }

    #[instrument(name = "ledger.payment_summary", skip(self), err)]
    pub fn payment_summary(&self, period: ReportPeriod) -> Result<Vec<PaymentSummaryRow>> {
        let (from, to) = period.bounds(self.today(), self.config.week_start);
        Ok(reports::payment_summary(&self.repository.list_payments()?, DateRange::between(from, to)))
    }

    // reports

    #[instrument(name = "ledger.loan_report", skip(self), err)]
    pub fn loan_report(&self, filter: LoanFilter) -> Result<Vec<LoanView>> {
        let rows = reports::loan_report(&self.data()?, &filter);
        debug!(rows = rows.len(), "loan report");
        Ok(rows)
    }

    #[instrument(name = "ledger.payment_report", skip(self), err)]
    pub fn payment_report(&self, filter: PaymentFilter) -> Result<Vec<PaymentView>> {
        let rows = reports::payment_report(&self.data()?, &filter);
        debug!(rows = rows.len(), "payment report");
        Ok(rows)
    }

    #[instrument(name = "ledger.client_report", skip(self), err)]
    pub fn client_report(&self, status: Option<ClientStatus>) -> Result<Vec<ClientReportRow>> {
        Ok(reports::client_report(&self.data()?, status))
    }

    #[instrument(name = "ledger.delinquency_report", skip(self), err)]
    pub fn delinquency_report(&self) -> Result<Vec<DelinquencyRow>> {
        let rows = reports::delinquency_report(&self.data()?, self.today(), self.config.due_soon_days);
        debug!(rows = rows.len(), "delinquency report");
        Ok(rows)
    }

    /// daily inflow; a missing bound falls back to the current month's
    #[instrument(name = "ledger.cash_flow", skip(self), err)]
    pub fn cash_flow(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Vec<CashFlowRow>> {
        let (month_start, month_end) = ReportPeriod::Month.bounds(self.today(), self.config.week_start);
        let range = DateRange::between(from.unwrap_or(month_start), to.unwrap_or(month_end));
        Ok(reports::cash_flow(&self.repository.list_payments()?, range))
    }

    #[instrument(name = "ledger.performance", skip(self), err)]
    pub fn performance(&self, period: ReportPeriod) -> Result<PerformanceReport> {
        let (from, to) = period.bounds(self.today(), self.config.week_start);
        Ok(reports::performance(&self.data()?, period, from, to))
    }

    /// clients by amount lent; `None` uses the configured limit
    #[instrument(name = "ledger.top_clients", skip(self), err)]
    pub fn top_clients(&self, limit: Option<usize>) -> Result<Vec<TopClientRow>> {
        let limit = limit.unwrap_or(self.config.top_clients_limit);
        Ok(reports::top_clients(&self.data()?, limit))
    }

    #[instrument(name = "ledger.statistics", skip(self), err)]
    pub fn statistics(&self) -> Result<Statistics> {
        Ok(reports::statistics(&self.data()?, self.today()))
    }

    /// csv of loans (by start date) or payments (by applied date) in range
    #[instrument(name = "ledger.export_csv", skip(self), err)]
    pub fn export_csv(&self, kind: ExportKind, range: DateRange) -> Result<String> {
        let data = self.data()?;
        let csv = match kind {
            ExportKind::Loans => {
                let filter = LoanFilter { start: range, status: None };
                reports::export_loans_csv(&reports::loan_report(&data, &filter))?
            }
            ExportKind::Payments => {
                let filter = PaymentFilter { applied: range, kind: None };
                reports::export_payments_csv(&reports::payment_report(&data, &filter))?
            }
        };
        info!(?kind, bytes = csv.len(), "csv exported");
        Ok(csv)
    }
}
