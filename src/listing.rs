use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{MarketError, Result};
use crate::types::{ListingId, ListingKind};

/// an open proposal awaiting a counterparty
///
/// immutable once created; the marketplace removes it the instant it is
/// matched or withdrawn by its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanListing {
    pub id: ListingId,
    pub kind: ListingKind,
    pub principal: Money,
    pub interest_rate: Rate,
    pub duration_months: u32,
    pub requires_collateral: bool,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl LoanListing {
    pub fn new(
        kind: ListingKind,
        principal: Money,
        interest_rate: Rate,
        duration_months: u32,
        requires_collateral: bool,
        owner_id: String,
        time_provider: &SafeTimeProvider,
    ) -> Result<Self> {
        if principal.is_zero() {
            return Err(MarketError::InvalidAmount {
                amount: principal.to_string(),
            });
        }
        if duration_months == 0 {
            return Err(MarketError::InvalidTerms {
                message: "duration must be at least one month".to_string(),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            principal,
            interest_rate,
            duration_months,
            requires_collateral,
            owner_id,
            created_at: time_provider.now(),
        })
    }

    /// strict matching rule: principal, rate, and duration must be identical
    ///
    /// the collateral flag is display-level metadata and does not gate a
    /// match; negotiation is not part of the market.
    pub fn terms_match(&self, other: &LoanListing) -> bool {
        self.principal == other.principal
            && self.interest_rate == other.interest_rate
            && self.duration_months == other.duration_months
    }
}
