/// full lifecycle walkthrough - match, partial repayments, and a default,
/// driven on a controlled clock
use chrono::{Duration, TimeZone, Utc};
use lending_market_rs::{
    projected_total_obligation, suggested_next_payment, ListingKind, Marketplace, Money, Rate,
    SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let control = time.test_control().expect("test source");

    // preview before anyone commits
    let preview =
        projected_total_obligation(Money::from_btc_str("1.0")?, Rate::from_percent_u32(12), 6)?;
    println!("a 1 BTC loan at 12% over 6 months will cost {} BTC", preview);

    let mut market = Marketplace::new();
    let request = market.create_listing(
        ListingKind::Request,
        Money::from_btc_str("1.0")?,
        Rate::from_percent_u32(12),
        6,
        false,
        "alice".to_string(),
        &time,
    )?;
    let offer = market.create_listing(
        ListingKind::Offer,
        Money::from_btc_str("1.0")?,
        Rate::from_percent_u32(12),
        6,
        false,
        "bob".to_string(),
        &time,
    )?;

    let loan_id = market.match_listings(request.id, offer.id, &time)?.id;
    println!("loan activated, due {}", market.get_loan(loan_id)?.due_at.unwrap());

    // two months in, alice repays a chunk
    control.advance(Duration::days(60));
    let suggestion = suggested_next_payment(market.get_loan(loan_id)?, Money::from_btc_str("0.4")?)?;
    market.record_repayment(loan_id, suggestion, &time)?;
    println!(
        "outstanding after first payment: {} BTC",
        market.get_loan(loan_id)?.outstanding_balance()
    );

    // the term lapses with a balance remaining; the scheduler steps in
    control.advance(Duration::days(150));
    let loan = market.mark_defaulted(loan_id, &time)?;
    println!(
        "loan {:?} with {} BTC unpaid",
        loan.status,
        loan.outstanding_balance()
    );

    for event in market.take_events() {
        println!("event: {:?}", event);
    }

    Ok(())
}
