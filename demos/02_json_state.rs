/// serialize a loan to json the way an embedding application would persist it
use lending_market_rs::{
    ListingKind, Marketplace, Money, Rate, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let mut market = Marketplace::new();

    let request = market.create_listing(
        ListingKind::Request,
        Money::from_btc_str("0.75")?,
        Rate::from_percent_u32(10),
        12,
        true,
        "alice".to_string(),
        &time,
    )?;
    println!("listing:\n{}\n", serde_json::to_string_pretty(&request)?);

    let offer = market.create_listing(
        ListingKind::Offer,
        Money::from_btc_str("0.75")?,
        Rate::from_percent_u32(10),
        12,
        false,
        "bob".to_string(),
        &time,
    )?;

    let loan_id = market.match_listings(request.id, offer.id, &time)?.id;
    market.record_repayment(loan_id, Money::from_btc_str("0.1")?, &time)?;

    let loan = market.get_loan(loan_id)?;
    println!("loan:\n{}", serde_json::to_string_pretty(loan)?);

    Ok(())
}
