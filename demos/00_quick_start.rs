/// quick start - register a client, lend, take a payment
use lending_ledger::{
    LedgerConfig, LedgerService, Money, NewClient, NewLoan, NewPayment, SafeTimeProvider,
    TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ledger = LedgerService::in_memory(
        LedgerConfig::default(),
        SafeTimeProvider::new(TimeSource::System),
    )?;

    let ana = ledger.register_client(NewClient::new("Ana", "Torres", "0102030405"))?;

    // $10,000 at 12% over a year
    let loan = ledger.originate_loan(NewLoan::new(ana.id, Money::from_major(10_000), dec!(12), 12))?;
    println!("monthly installment: {}", loan.monthly_installment);

    let receipt = ledger.record_payment(NewPayment::new(loan.id, loan.monthly_installment))?;
    println!("balance after first payment: {}", receipt.loan.outstanding_balance);

    println!("{}", ledger.loan(loan.id)?.to_json_pretty()?);

    Ok(())
}
