use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a marketplace listing
pub type ListingId = Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// which side of the market a listing sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingKind {
    /// seeking to borrow
    Request,
    /// seeking to lend
    Offer,
}

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// matched but not yet activated
    Pending,
    /// funded and accepting repayments
    Active,
    /// obligation met in full
    Repaid,
    /// past due with an unpaid balance
    Defaulted,
    /// withdrawn before activation
    Cancelled,
}

impl LoanStatus {
    /// terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoanStatus::Repaid | LoanStatus::Defaulted | LoanStatus::Cancelled
        )
    }
}

/// one entry in a loan's append-only repayment history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentRecord {
    pub amount: Money,
    pub timestamp: DateTime<Utc>,
}
