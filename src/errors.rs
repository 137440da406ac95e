use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{ListingId, ListingKind, LoanId, LoanStatus};

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: String,
    },

    #[error("invalid decimal format: {input}")]
    InvalidFormat {
        input: String,
    },

    #[error("result would be negative: {minuend} - {subtrahend}")]
    NegativeResult {
        minuend: Money,
        subtrahend: Money,
    },

    #[error("repayment exceeds outstanding balance: outstanding {outstanding}, requested {requested}")]
    OverRepayment {
        outstanding: Money,
        requested: Money,
    },

    #[error("payment below minimum unit: minimum {minimum}, provided {provided}")]
    BelowMinimum {
        minimum: Money,
        provided: Money,
    },

    #[error("listing terms do not match: request {request_id}, offer {offer_id}")]
    TermsMismatch {
        request_id: ListingId,
        offer_id: ListingId,
    },

    #[error("both listings belong to the same owner: {owner_id}")]
    SelfMatch {
        owner_id: String,
    },

    #[error("operation {operation} not permitted in status {status:?}")]
    IllegalTransition {
        operation: &'static str,
        status: LoanStatus,
    },

    #[error("loan not yet past due: due {due_at}, current time {current_time}")]
    NotPastDue {
        due_at: DateTime<Utc>,
        current_time: DateTime<Utc>,
    },

    #[error("listing not found: {id}")]
    ListingNotFound {
        id: ListingId,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("listing already matched into loan {loan_id}: {id}")]
    AlreadyMatched {
        id: ListingId,
        loan_id: LoanId,
    },

    #[error("listing {id} is a {actual:?}, expected a {expected:?}")]
    ListingKindMismatch {
        id: ListingId,
        expected: ListingKind,
        actual: ListingKind,
    },

    #[error("invalid terms: {message}")]
    InvalidTerms {
        message: String,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, MarketError>;
