/// save the ledger to json and load it back
use lending_ledger::{
    InMemoryRepository, LedgerConfig, LedgerService, LedgerSnapshot, Money, NewClient, NewLoan,
    NewPayment, SafeTimeProvider, TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let ledger = LedgerService::in_memory(LedgerConfig::default(), time.clone())?;

    let luis = ledger.register_client(NewClient::new("Luis", "Vega", "0911223344").phone("555-0101"))?;
    let loan = ledger.originate_loan(NewLoan::new(luis.id, Money::from_major(1_200), dec!(0), 12))?;
    ledger.record_payment(NewPayment::new(loan.id, Money::from_major(100)))?;

    for event in ledger.take_events() {
        println!("{event:?}");
    }

    let snapshot = ledger.repository().snapshot(time.now());
    let json = snapshot.to_json_pretty()?;
    println!("{json}");

    // restore into a fresh service
    let restored = InMemoryRepository::from_snapshot(LedgerSnapshot::from_json(&json)?)?;
    let ledger = LedgerService::new(restored, LedgerConfig::default(), time)?;
    println!("restored balance: {}", ledger.loan(loan.id)?.outstanding_balance);

    Ok(())
}
