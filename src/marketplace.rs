use std::collections::HashMap;

use hourglass_rs::SafeTimeProvider;

use crate::decimal::{Money, Rate};
use crate::errors::{MarketError, Result};
use crate::events::{Event, EventStore};
use crate::listing::LoanListing;
use crate::loan::Loan;
use crate::types::{ListingId, ListingKind, LoanId};

/// filter for browsing the open marketplace
///
/// pagination is the caller's concern; results come back oldest-first so
/// slices are stable between calls.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub kind: Option<ListingKind>,
    pub requires_collateral: Option<bool>,
    pub owner_id: Option<String>,
    pub min_principal: Option<Money>,
    pub max_principal: Option<Money>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &LoanListing) -> bool {
        if let Some(kind) = self.kind {
            if listing.kind != kind {
                return false;
            }
        }
        if let Some(requires) = self.requires_collateral {
            if listing.requires_collateral != requires {
                return false;
            }
        }
        if let Some(owner) = &self.owner_id {
            if &listing.owner_id != owner {
                return false;
            }
        }
        if let Some(min) = self.min_principal {
            if listing.principal < min {
                return false;
            }
        }
        if let Some(max) = self.max_principal {
            if listing.principal > max {
                return false;
            }
        }
        true
    }
}

/// the open marketplace and loan ledger
///
/// single-writer component: every mutating operation validates fully before
/// touching state, so a failed call is never observed half-applied. the
/// embedding application wraps calls in its own transaction boundary and
/// drains events afterwards.
#[derive(Debug, Default)]
pub struct Marketplace {
    listings: HashMap<ListingId, LoanListing>,
    matched: HashMap<ListingId, LoanId>,
    loans: HashMap<LoanId, Loan>,
    events: EventStore,
}

impl Marketplace {
    pub fn new() -> Self {
        Self::default()
    }

    /// post a new listing to the open marketplace
    pub fn create_listing(
        &mut self,
        kind: ListingKind,
        principal: Money,
        interest_rate: Rate,
        duration_months: u32,
        requires_collateral: bool,
        owner_id: String,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanListing> {
        let listing = LoanListing::new(
            kind,
            principal,
            interest_rate,
            duration_months,
            requires_collateral,
            owner_id,
            time_provider,
        )?;

        self.events.emit(Event::ListingCreated {
            listing_id: listing.id,
            kind: listing.kind,
            principal: listing.principal,
            interest_rate: listing.interest_rate,
            duration_months: listing.duration_months,
            owner_id: listing.owner_id.clone(),
            timestamp: listing.created_at,
        });
        self.listings.insert(listing.id, listing.clone());

        Ok(listing)
    }

    /// remove an unmatched listing from the open marketplace
    pub fn withdraw_listing(
        &mut self,
        listing_id: ListingId,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        if let Some(loan_id) = self.matched.get(&listing_id) {
            return Err(MarketError::AlreadyMatched {
                id: listing_id,
                loan_id: *loan_id,
            });
        }
        if self.listings.remove(&listing_id).is_none() {
            return Err(MarketError::ListingNotFound { id: listing_id });
        }

        self.events.emit(Event::ListingWithdrawn {
            listing_id,
            timestamp: time_provider.now(),
        });

        Ok(())
    }

    /// pair a request with an offer and activate the resulting loan
    ///
    /// strict matching: identical principal, rate, and duration, distinct
    /// owners. all checks run before any mutation, so a rejected match
    /// leaves both listings in the open set untouched.
    pub fn match_listings(
        &mut self,
        request_id: ListingId,
        offer_id: ListingId,
        time_provider: &SafeTimeProvider,
    ) -> Result<&Loan> {
        let request = self.open_listing(request_id)?;
        let offer = self.open_listing(offer_id)?;

        if request.kind != ListingKind::Request {
            return Err(MarketError::ListingKindMismatch {
                id: request_id,
                expected: ListingKind::Request,
                actual: request.kind,
            });
        }
        if offer.kind != ListingKind::Offer {
            return Err(MarketError::ListingKindMismatch {
                id: offer_id,
                expected: ListingKind::Offer,
                actual: offer.kind,
            });
        }
        if request.owner_id == offer.owner_id {
            return Err(MarketError::SelfMatch {
                owner_id: request.owner_id.clone(),
            });
        }
        if !request.terms_match(offer) {
            return Err(MarketError::TermsMismatch {
                request_id,
                offer_id,
            });
        }

        // the request's owner borrows, the offer's owner lends. activation
        // is fallible (the obligation may not be representable), so it runs
        // into a staging store before any state is touched
        let mut loan = Loan::new(
            request.owner_id.clone(),
            offer.owner_id.clone(),
            request.principal,
            request.interest_rate,
            request.duration_months,
            request.requires_collateral || offer.requires_collateral,
            time_provider,
        )?;
        let loan_id = loan.id;
        let mut activation_events = EventStore::new();
        loan.activate(time_provider, &mut activation_events)?;

        // past this point nothing can fail: both listings leave the open
        // set and the loan lands in the ledger in one logical operation
        self.listings.remove(&request_id);
        self.listings.remove(&offer_id);
        self.matched.insert(request_id, loan_id);
        self.matched.insert(offer_id, loan_id);

        self.events.emit(Event::ListingsMatched {
            request_id,
            offer_id,
            loan_id,
            timestamp: time_provider.now(),
        });
        for event in activation_events.take_events() {
            self.events.emit(event);
        }
        self.loans.insert(loan_id, loan);

        self.loans
            .get(&loan_id)
            .ok_or(MarketError::LoanNotFound { id: loan_id })
    }

    /// record a repayment against a loan in the ledger
    pub fn record_repayment(
        &mut self,
        loan_id: LoanId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<&Loan> {
        let loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(MarketError::LoanNotFound { id: loan_id })?;
        loan.record_repayment(amount, time_provider, &mut self.events)?;
        Ok(loan)
    }

    /// scheduler entry point: move an overdue loan to defaulted
    pub fn mark_defaulted(
        &mut self,
        loan_id: LoanId,
        time_provider: &SafeTimeProvider,
    ) -> Result<&Loan> {
        let loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(MarketError::LoanNotFound { id: loan_id })?;
        loan.mark_defaulted(time_provider, &mut self.events)?;
        Ok(loan)
    }

    pub fn get_loan(&self, loan_id: LoanId) -> Result<&Loan> {
        self.loans
            .get(&loan_id)
            .ok_or(MarketError::LoanNotFound { id: loan_id })
    }

    /// browse open listings, oldest first
    pub fn list_open_listings(&self, filter: &ListingFilter) -> Vec<&LoanListing> {
        let mut matches: Vec<&LoanListing> = self
            .listings
            .values()
            .filter(|l| filter.matches(l))
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        matches
    }

    pub fn open_listing_count(&self) -> usize {
        self.listings.len()
    }

    /// drain events collected since the last call
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    fn open_listing(&self, id: ListingId) -> Result<&LoanListing> {
        if let Some(listing) = self.listings.get(&id) {
            return Ok(listing);
        }
        if let Some(loan_id) = self.matched.get(&id) {
            return Err(MarketError::AlreadyMatched {
                id,
                loan_id: *loan_id,
            });
        }
        Err(MarketError::ListingNotFound { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LoanStatus;
    use chrono::{Duration, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn btc(s: &str) -> Money {
        Money::from_btc_str(s).unwrap()
    }

    fn post(
        market: &mut Marketplace,
        time: &SafeTimeProvider,
        kind: ListingKind,
        principal: &str,
        rate: u32,
        months: u32,
        owner: &str,
    ) -> LoanListing {
        market
            .create_listing(
                kind,
                btc(principal),
                Rate::from_percent_u32(rate),
                months,
                false,
                owner.to_string(),
                time,
            )
            .unwrap()
    }

    #[test]
    fn test_create_and_browse_listings() {
        let time = test_time();
        let mut market = Marketplace::new();

        post(&mut market, &time, ListingKind::Request, "1.0", 10, 12, "alice");
        post(&mut market, &time, ListingKind::Offer, "1.0", 10, 12, "bob");
        post(&mut market, &time, ListingKind::Offer, "2.0", 8, 6, "carol");

        let all = market.list_open_listings(&ListingFilter::default());
        assert_eq!(all.len(), 3);

        let offers = market.list_open_listings(&ListingFilter {
            kind: Some(ListingKind::Offer),
            ..Default::default()
        });
        assert_eq!(offers.len(), 2);

        let carols = market.list_open_listings(&ListingFilter {
            owner_id: Some("carol".to_string()),
            ..Default::default()
        });
        assert_eq!(carols.len(), 1);
        assert_eq!(carols[0].principal, btc("2.0"));

        let big = market.list_open_listings(&ListingFilter {
            min_principal: Some(btc("1.5")),
            ..Default::default()
        });
        assert_eq!(big.len(), 1);
    }

    #[test]
    fn test_withdraw_listing() {
        let time = test_time();
        let mut market = Marketplace::new();
        let listing = post(&mut market, &time, ListingKind::Request, "1.0", 10, 12, "alice");

        market.withdraw_listing(listing.id, &time).unwrap();
        assert_eq!(market.open_listing_count(), 0);

        let err = market.withdraw_listing(listing.id, &time).unwrap_err();
        assert!(matches!(err, MarketError::ListingNotFound { .. }));

        let err = market.withdraw_listing(Uuid::new_v4(), &time).unwrap_err();
        assert!(matches!(err, MarketError::ListingNotFound { .. }));
    }

    #[test]
    fn test_match_creates_active_loan() {
        let time = test_time();
        let mut market = Marketplace::new();
        let request = post(&mut market, &time, ListingKind::Request, "1.0", 12, 6, "alice");
        let offer = post(&mut market, &time, ListingKind::Offer, "1.0", 12, 6, "bob");

        let loan_id = {
            let loan = market.match_listings(request.id, offer.id, &time).unwrap();
            assert_eq!(loan.status, LoanStatus::Active);
            assert_eq!(loan.borrower_id, "alice");
            assert_eq!(loan.lender_id, "bob");
            assert_eq!(loan.total_obligation, Some(btc("1.06")));
            loan.id
        };

        // both listings left the open set atomically
        assert_eq!(market.open_listing_count(), 0);
        assert!(market.get_loan(loan_id).is_ok());

        let events = market.take_events();
        let matched_pos = events
            .iter()
            .position(|e| matches!(e, Event::ListingsMatched { .. }))
            .unwrap();
        let activated_pos = events
            .iter()
            .position(|e| matches!(e, Event::LoanActivated { .. }))
            .unwrap();
        assert!(matched_pos < activated_pos);
    }

    #[test]
    fn test_terms_mismatch_leaves_listings_open() {
        let time = test_time();
        let mut market = Marketplace::new();
        let request = post(&mut market, &time, ListingKind::Request, "1.0", 10, 12, "alice");
        let offer = post(&mut market, &time, ListingKind::Offer, "1.0", 8, 12, "bob");

        let err = market.match_listings(request.id, offer.id, &time).unwrap_err();
        assert!(matches!(err, MarketError::TermsMismatch { .. }));
        assert_eq!(market.open_listing_count(), 2);

        // both can still be withdrawn
        market.withdraw_listing(request.id, &time).unwrap();
        market.withdraw_listing(offer.id, &time).unwrap();
    }

    #[test]
    fn test_self_match_rejected() {
        let time = test_time();
        let mut market = Marketplace::new();
        let request = post(&mut market, &time, ListingKind::Request, "1.0", 10, 12, "alice");
        let offer = post(&mut market, &time, ListingKind::Offer, "1.0", 10, 12, "alice");

        let err = market.match_listings(request.id, offer.id, &time).unwrap_err();
        assert!(matches!(err, MarketError::SelfMatch { .. }));
        assert_eq!(market.open_listing_count(), 2);
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let time = test_time();
        let mut market = Marketplace::new();
        let a = post(&mut market, &time, ListingKind::Request, "1.0", 10, 12, "alice");
        let b = post(&mut market, &time, ListingKind::Request, "1.0", 10, 12, "bob");

        let err = market.match_listings(a.id, b.id, &time).unwrap_err();
        assert!(matches!(err, MarketError::ListingKindMismatch { .. }));
        assert_eq!(market.open_listing_count(), 2);
    }

    #[test]
    fn test_matched_listing_cannot_be_withdrawn_or_rematched() {
        let time = test_time();
        let mut market = Marketplace::new();
        let request = post(&mut market, &time, ListingKind::Request, "1.0", 10, 12, "alice");
        let offer = post(&mut market, &time, ListingKind::Offer, "1.0", 10, 12, "bob");
        market.match_listings(request.id, offer.id, &time).unwrap();

        let err = market.withdraw_listing(request.id, &time).unwrap_err();
        assert!(matches!(err, MarketError::AlreadyMatched { .. }));

        let fresh = post(&mut market, &time, ListingKind::Offer, "1.0", 10, 12, "carol");
        let err = market.match_listings(request.id, fresh.id, &time).unwrap_err();
        assert!(matches!(err, MarketError::AlreadyMatched { .. }));
    }

    #[test]
    fn test_unrepresentable_obligation_leaves_listings_open() {
        let time = test_time();
        let mut market = Marketplace::new();

        // a rate this absurd pushes the obligation past what satoshis can
        // represent, so activation fails after every precondition passes
        let rate = Rate::from_percent(dec!(100000000000000)).unwrap();
        let request = market
            .create_listing(
                ListingKind::Request,
                btc("1.0"),
                rate,
                12,
                false,
                "alice".to_string(),
                &time,
            )
            .unwrap();
        let offer = market
            .create_listing(
                ListingKind::Offer,
                btc("1.0"),
                rate,
                12,
                false,
                "bob".to_string(),
                &time,
            )
            .unwrap();

        let err = market.match_listings(request.id, offer.id, &time).unwrap_err();
        assert!(matches!(err, MarketError::CalculationError { .. }));

        // the failed match is never observed half-applied
        assert_eq!(market.open_listing_count(), 2);
        market.withdraw_listing(request.id, &time).unwrap();
        market.withdraw_listing(offer.id, &time).unwrap();
    }

    #[test]
    fn test_repayment_through_marketplace() {
        let time = test_time();
        let mut market = Marketplace::new();
        let request = post(&mut market, &time, ListingKind::Request, "1.0", 12, 6, "alice");
        let offer = post(&mut market, &time, ListingKind::Offer, "1.0", 12, 6, "bob");
        let loan_id = market
            .match_listings(request.id, offer.id, &time)
            .unwrap()
            .id;

        let loan = market.record_repayment(loan_id, btc("0.53"), &time).unwrap();
        assert_eq!(loan.outstanding_balance(), btc("0.53"));
        assert_eq!(loan.status, LoanStatus::Active);

        let loan = market.record_repayment(loan_id, btc("0.53"), &time).unwrap();
        assert_eq!(loan.status, LoanStatus::Repaid);

        let err = market
            .record_repayment(loan_id, btc("0.01"), &time)
            .unwrap_err();
        assert!(matches!(err, MarketError::IllegalTransition { .. }));
    }

    #[test]
    fn test_default_through_marketplace() {
        let time = test_time();
        let control = time.test_control().unwrap();
        let mut market = Marketplace::new();
        let request = post(&mut market, &time, ListingKind::Request, "1.0", 12, 6, "alice");
        let offer = post(&mut market, &time, ListingKind::Offer, "1.0", 12, 6, "bob");
        let loan_id = market
            .match_listings(request.id, offer.id, &time)
            .unwrap()
            .id;

        let err = market.mark_defaulted(loan_id, &time).unwrap_err();
        assert!(matches!(err, MarketError::NotPastDue { .. }));

        control.advance(Duration::days(200));
        let loan = market.mark_defaulted(loan_id, &time).unwrap();
        assert_eq!(loan.status, LoanStatus::Defaulted);
    }

    #[test]
    fn test_get_loan_not_found() {
        let market = Marketplace::new();
        let err = market.get_loan(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, MarketError::LoanNotFound { .. }));
    }
}
