use std::cmp::Reverse;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::decimal::Money;
use crate::types::{ClientId, ClientStatus, LoanStatus, MaturityStatus};
use crate::views::{LoanView, PaymentView};

use super::{average_rate_percent, LedgerData, LoanFilter, PaymentFilter};

/// per-client lending totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientReportRow {
    #[serde(flatten)]
    pub client: Client,
    pub total_loans: usize,
    pub active_loans: usize,
    pub paid_loans: usize,
    pub total_lent: Money,
    pub total_paid: Money,
}

/// active loan with outstanding balance and its maturity standing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelinquencyRow {
    pub loan: LoanView,
    pub maturity_status: MaturityStatus,
    /// negative while the end date is still ahead
    pub days_overdue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopClientRow {
    pub client_id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub total_loans: usize,
    pub total_lent: Money,
    pub total_paid: Money,
}

/// portfolio-wide counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub active_clients: usize,
    pub total_loans: usize,
    pub active_loans: usize,
    pub paid_loans: usize,
    pub total_lent: Money,
    pub total_collected: Money,
    pub average_rate_percent: Decimal,
    pub overdue_loans: usize,
}

/// loans matching the filter, newest start date first
pub fn loan_report(data: &LedgerData, filter: &LoanFilter) -> Vec<LoanView> {
    let directory = data.directory();
    let mut rows = directory.loan_views(data.loans.iter().filter(|l| filter.matches(l)), &data.payments);
    rows.sort_by_key(|r| Reverse(r.start_date));
    rows
}

/// payments matching the filter, newest first
pub fn payment_report(data: &LedgerData, filter: &PaymentFilter) -> Vec<PaymentView> {
    let directory = data.directory();
    let mut rows = directory.payment_views(data.payments.iter().filter(|p| filter.matches(p)));
    rows.sort_by_key(|r| Reverse(r.applied_at));
    rows
}

/// lending totals per client, newest registration first
pub fn client_report(data: &LedgerData, status: Option<ClientStatus>) -> Vec<ClientReportRow> {
    let mut rows: Vec<ClientReportRow> = data
        .clients
        .iter()
        .filter(|c| status.map_or(true, |s| s == c.status))
        .map(|client| {
            let loans: Vec<_> = data.loans.iter().filter(|l| l.client_id == client.id).collect();
            ClientReportRow {
                client: client.clone(),
                total_loans: loans.len(),
                active_loans: loans.iter().filter(|l| l.status == LoanStatus::Active).count(),
                paid_loans: loans.iter().filter(|l| l.status == LoanStatus::Paid).count(),
                total_lent: loans.iter().map(|l| l.principal).sum(),
                total_paid: data.paid_by_client(client.id),
            }
        })
        .collect();

    rows.sort_by_key(|r| Reverse(r.client.registered_at));
    rows
}

/// active loans still owing, earliest end date first
pub fn delinquency_report(data: &LedgerData, today: NaiveDate, due_soon_days: u32) -> Vec<DelinquencyRow> {
    let directory = data.directory();
    let owing = data
        .loans
        .iter()
        .filter(|l| l.is_active() && l.outstanding_balance.is_positive());

    let mut rows: Vec<DelinquencyRow> = owing
        .filter_map(|loan| {
            let client = directory.client(loan.client_id)?;
            Some(DelinquencyRow {
                loan: LoanView::new(loan, client, &data.payments),
                maturity_status: loan.maturity_status(today, due_soon_days),
                days_overdue: loan.days_overdue(today),
            })
        })
        .collect();

    rows.sort_by_key(|r| r.loan.end_date);
    rows
}

/// clients ranked by amount lent
pub fn top_clients(data: &LedgerData, limit: usize) -> Vec<TopClientRow> {
    let mut rows: Vec<TopClientRow> = data
        .clients
        .iter()
        .map(|client| {
            let loans: Vec<_> = data.loans.iter().filter(|l| l.client_id == client.id).collect();
            TopClientRow {
                client_id: client.id,
                first_name: client.first_name.clone(),
                last_name: client.last_name.clone(),
                national_id: client.national_id.clone(),
                total_loans: loans.len(),
                total_lent: loans.iter().map(|l| l.principal).sum(),
                total_paid: data.paid_by_client(client.id),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_lent
            .cmp(&a.total_lent)
            .then_with(|| a.last_name.cmp(&b.last_name))
            .then_with(|| a.first_name.cmp(&b.first_name))
    });
    rows.truncate(limit);
    rows
}

pub fn statistics(data: &LedgerData, today: NaiveDate) -> Statistics {
    Statistics {
        active_clients: data.clients.iter().filter(|c| c.is_active()).count(),
        total_loans: data.loans.len(),
        active_loans: data.loans.iter().filter(|l| l.status == LoanStatus::Active).count(),
        paid_loans: data.loans.iter().filter(|l| l.status == LoanStatus::Paid).count(),
        total_lent: data.loans.iter().map(|l| l.principal).sum(),
        total_collected: data.payments.iter().map(|p| p.amount).sum(),
        average_rate_percent: average_rate_percent(&data.loans),
        overdue_loans: data.loans.iter().filter(|l| l.is_overdue(today)).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NewClient;
    use crate::config::LedgerConfig;
    use crate::loan::{Loan, NewLoan};
    use crate::payments::{NewPayment, Payment};
    use crate::types::{DateRange, PaymentKind};
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        data: LedgerData,
        ana: Client,
        luis: Client,
    }

    /// ana: 12k over two loans (one paid), luis: 3k active and overdue, eva: nothing
    fn fixture() -> Fixture {
        let config = LedgerConfig::default();
        let t0 = Utc.with_ymd_and_hms(2023, 1, 1, 9, 0, 0).unwrap();

        let ana = Client::register(NewClient::new("Ana", "Torres", "111"), t0).unwrap();
        let luis = Client::register(NewClient::new("Luis", "Vega", "222"), t0 + Duration::days(1)).unwrap();
        let mut eva = Client::register(NewClient::new("Eva", "Ruiz", "333"), t0 + Duration::days(2)).unwrap();
        eva.status = ClientStatus::Inactive;

        let ana_big = Loan::originate(
            &NewLoan::new(ana.id, Money::from_major(10_000), dec!(12), 12).starting(date(2023, 6, 1)),
            &config,
            date(2023, 6, 1),
            t0,
        )
        .unwrap();
        let mut ana_small = Loan::originate(
            &NewLoan::new(ana.id, Money::from_major(2_000), dec!(6), 6).starting(date(2023, 2, 1)),
            &config,
            date(2023, 2, 1),
            t0,
        )
        .unwrap();
        let mut luis_loan = Loan::originate(
            &NewLoan::new(luis.id, Money::from_major(3_000), dec!(9), 3).starting(date(2023, 3, 10)),
            &config,
            date(2023, 3, 10),
            t0,
        )
        .unwrap();

        ana_small.apply_payment(Money::from_major(2_000)).unwrap();
        luis_loan.apply_payment(Money::from_major(500)).unwrap();

        let payments = vec![
            Payment::new(
                NewPayment::new(ana_small.id, Money::from_major(2_000)),
                PaymentKind::Settlement,
                Utc.with_ymd_and_hms(2023, 7, 1, 10, 0, 0).unwrap(),
            ),
            Payment::new(
                NewPayment::new(luis_loan.id, Money::from_major(500)),
                PaymentKind::Installment,
                Utc.with_ymd_and_hms(2023, 4, 10, 10, 0, 0).unwrap(),
            ),
        ];

        Fixture {
            data: LedgerData {
                clients: vec![ana.clone(), luis.clone(), eva],
                loans: vec![ana_big, ana_small, luis_loan],
                payments,
            },
            ana,
            luis,
        }
    }

    #[test]
    fn test_loan_report_filters_and_orders() {
        let f = fixture();

        let all = loan_report(&f.data, &LoanFilter::default());
        let starts: Vec<_> = all.iter().map(|r| r.start_date).collect();
        assert_eq!(starts, vec![date(2023, 6, 1), date(2023, 3, 10), date(2023, 2, 1)]);

        let paid = loan_report(
            &f.data,
            &LoanFilter {
                status: Some(LoanStatus::Paid),
                ..Default::default()
            },
        );
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].total_paid, Money::from_major(2_000));

        let spring = loan_report(
            &f.data,
            &LoanFilter {
                start: DateRange::between(date(2023, 3, 1), date(2023, 5, 31)),
                status: None,
            },
        );
        assert_eq!(spring.len(), 1);
        assert_eq!(spring[0].client.client_id, f.luis.id);
    }

    #[test]
    fn test_payment_report_filters_by_kind_and_date() {
        let f = fixture();

        let all = payment_report(&f.data, &PaymentFilter::default());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind, PaymentKind::Settlement);

        let installments = payment_report(
            &f.data,
            &PaymentFilter {
                kind: Some(PaymentKind::Installment),
                ..Default::default()
            },
        );
        assert_eq!(installments.len(), 1);
        assert_eq!(installments[0].client.national_id, "222");

        let july = payment_report(
            &f.data,
            &PaymentFilter {
                applied: DateRange::between(date(2023, 7, 1), date(2023, 7, 31)),
                kind: None,
            },
        );
        assert_eq!(july.len(), 1);
    }

    #[test]
    fn test_client_report_totals() {
        let f = fixture();

        let rows = client_report(&f.data, None);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].client.national_id, "333");

        let ana = rows.iter().find(|r| r.client.id == f.ana.id).unwrap();
        assert_eq!(ana.total_loans, 2);
        assert_eq!(ana.active_loans, 1);
        assert_eq!(ana.paid_loans, 1);
        assert_eq!(ana.total_lent, Money::from_major(12_000));
        assert_eq!(ana.total_paid, Money::from_major(2_000));

        let inactive = client_report(&f.data, Some(ClientStatus::Inactive));
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].total_loans, 0);
    }

    #[test]
    fn test_delinquency_report() {
        let f = fixture();
        let today = date(2023, 6, 5);

        let rows = delinquency_report(&f.data, today, 7);
        assert_eq!(rows.len(), 2);

        // luis ended 2023-06-10: inside the warning window
        assert_eq!(rows[0].loan.client.client_id, f.luis.id);
        assert_eq!(rows[0].maturity_status, MaturityStatus::DueSoon);
        assert_eq!(rows[0].days_overdue, -5);
        assert_eq!(rows[0].loan.outstanding_balance, Money::from_major(2_500));

        assert_eq!(rows[1].maturity_status, MaturityStatus::Current);

        let later = delinquency_report(&f.data, date(2023, 6, 20), 7);
        assert_eq!(later[0].maturity_status, MaturityStatus::Overdue);
        assert_eq!(later[0].days_overdue, 10);
    }

    #[test]
    fn test_top_clients() {
        let f = fixture();

        let rows = top_clients(&f.data, 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].client_id, f.ana.id);
        assert_eq!(rows[0].total_lent, Money::from_major(12_000));
        assert_eq!(rows[1].client_id, f.luis.id);
        assert_eq!(rows[1].total_paid, Money::from_major(500));

        assert_eq!(top_clients(&f.data, 10).len(), 3);
    }

    #[test]
    fn test_statistics() {
        let f = fixture();
        let stats = statistics(&f.data, date(2023, 7, 1));

        assert_eq!(stats.active_clients, 2);
        assert_eq!(stats.total_loans, 3);
        assert_eq!(stats.active_loans, 2);
        assert_eq!(stats.paid_loans, 1);
        assert_eq!(stats.total_lent, Money::from_major(15_000));
        assert_eq!(stats.total_collected, Money::from_major(2_500));
        assert_eq!(stats.average_rate_percent, dec!(9));
        assert_eq!(stats.overdue_loans, 1);

        let empty = statistics(&LedgerData::default(), date(2023, 7, 1));
        assert_eq!(empty.average_rate_percent, Decimal::ZERO);
        assert_eq!(empty.total_lent, Money::ZERO);
    }
}
