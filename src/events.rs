use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{ListingId, ListingKind, LoanId};

/// all events that can be emitted by the marketplace
///
/// the core never logs; the embedding application drains these after each
/// transaction boundary and decides what to persist or present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // listing lifecycle
    ListingCreated {
        listing_id: ListingId,
        kind: ListingKind,
        principal: Money,
        interest_rate: Rate,
        duration_months: u32,
        owner_id: String,
        timestamp: DateTime<Utc>,
    },
    ListingWithdrawn {
        listing_id: ListingId,
        timestamp: DateTime<Utc>,
    },
    ListingsMatched {
        request_id: ListingId,
        offer_id: ListingId,
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },

    // loan lifecycle
    LoanActivated {
        loan_id: LoanId,
        total_obligation: Money,
        due_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    RepaymentRecorded {
        loan_id: LoanId,
        amount: Money,
        amount_repaid: Money,
        outstanding: Money,
        timestamp: DateTime<Utc>,
    },
    LoanRepaid {
        loan_id: LoanId,
        total_repaid: Money,
        timestamp: DateTime<Utc>,
    },
    LoanDefaulted {
        loan_id: LoanId,
        outstanding: Money,
        timestamp: DateTime<Utc>,
    },
    LoanCancelled {
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
