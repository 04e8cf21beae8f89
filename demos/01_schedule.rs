/// amortization table for a loan, without a ledger
use chrono::NaiveDate;
use lending_ledger::{calculate_installment, AmortizationSchedule, Money, Rate};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let principal = Money::from_major(5_000);
    let rate = Rate::from_percent(dec!(6));

    let installment = calculate_installment(principal, rate, 24)?;
    // month-end start: due dates clamp to the last day of shorter months
    let start = NaiveDate::from_ymd_opt(2024, 1, 31).ok_or("bad date")?;
    let schedule = AmortizationSchedule::generate(principal, rate, 24, installment, start)?;

    println!("installment: {installment}");
    println!("{:>3}  {:<10}  {:>9}  {:>9}  {:>10}", "#", "due", "principal", "interest", "balance");
    for entry in &schedule.entries {
        println!(
            "{:>3}  {}  {:>9}  {:>9}  {:>10}",
            entry.period, entry.due_date, entry.principal_portion, entry.interest_portion, entry.ending_balance
        );
    }
    println!("total interest: {}", schedule.total_interest);
    println!("total paid: {}", schedule.total_payment);

    Ok(())
}
