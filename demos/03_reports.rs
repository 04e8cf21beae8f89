/// portfolio reports on a pinned clock
use chrono::{Duration, TimeZone, Utc};
use lending_ledger::{
    DateRange, ExportKind, LedgerConfig, LedgerService, Money, NewClient, NewLoan, NewPayment,
    PaymentKind, ReportPeriod, SafeTimeProvider, TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let start = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).single().ok_or("bad start")?;
    let time = SafeTimeProvider::new(TimeSource::Test(start));
    let ledger = LedgerService::in_memory(LedgerConfig::default().with_due_soon_days(10), time.clone())?;

    let ana = ledger.register_client(NewClient::new("Ana", "Torres", "111"))?;
    let eva = ledger.register_client(NewClient::new("Eva", "Ruiz", "222").email("eva@example.com"))?;

    let short = ledger.originate_loan(NewLoan::new(ana.id, Money::from_major(900), dec!(18), 3))?;
    let long = ledger.originate_loan(NewLoan::new(eva.id, Money::from_major(8_000), dec!(11.5), 36))?;

    if let Some(control) = time.test_control() {
        for _ in 0..2 {
            control.advance(Duration::days(30));
            ledger.record_payment(NewPayment::new(short.id, short.monthly_installment))?;
            ledger.record_payment(
                NewPayment::new(long.id, long.monthly_installment).description("transfer, branch 4"),
            )?;
        }
        ledger.record_payment(NewPayment::new(long.id, Money::from_major(500)).kind(PaymentKind::Prepayment))?;
        control.advance(Duration::days(25));
    }

    println!("== delinquency ({})", ledger.today());
    for row in ledger.delinquency_report()? {
        println!(
            "{} {} ends {} {:?} ({} days)",
            row.loan.client.first_name, row.loan.outstanding_balance, row.loan.end_date, row.maturity_status, row.days_overdue
        );
    }

    println!("== cash flow");
    for row in ledger.cash_flow(Some(start.date_naive()), None)? {
        println!("{} {} ({} payments)", row.date, row.inflow, row.operations);
    }

    println!("== performance");
    println!("{}", serde_json::to_string_pretty(&ledger.performance(ReportPeriod::Quarter)?)?);

    println!("== statistics");
    println!("{}", serde_json::to_string_pretty(&ledger.statistics()?)?);

    println!("== payments.csv");
    print!("{}", ledger.export_csv(ExportKind::Payments, DateRange::default())?);

    Ok(())
}
