/// quick start - post two listings, match them, repay the loan
use lending_market_rs::{
    ListingKind, Marketplace, Money, Rate, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let mut market = Marketplace::new();

    // alice wants to borrow 1 btc for 6 months at 12%
    let request = market.create_listing(
        ListingKind::Request,
        Money::from_btc_str("1.0")?,
        Rate::from_percent_u32(12),
        6,
        false,
        "alice".to_string(),
        &time,
    )?;

    // bob offers exactly those terms
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
    let loan = market.get_loan(loan_id)?;
    println!("total obligation: {} BTC", loan.outstanding_balance());

    // alice pays half, then the rest
    market.record_repayment(loan_id, Money::from_btc_str("0.53")?, &time)?;
    let loan = market.record_repayment(loan_id, Money::from_btc_str("0.53")?, &time)?;
    println!("final status: {:?}", loan.status);

    Ok(())
}
