use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};
use crate::errors::{MarketError, Result};
use crate::loan::Loan;
use crate::types::LoanStatus;

/// total owed over the full term: principal * (1 + rate/100 * months/12)
///
/// the same formula activation freezes into a loan, usable before any loan
/// exists so a borrower can preview the obligation. deterministic and never
/// less than the principal.
pub fn projected_total_obligation(
    principal: Money,
    interest_rate: Rate,
    duration_months: u32,
) -> Result<Money> {
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

    let period = Decimal::from(duration_months) / Decimal::from(12);
    let interest = principal.multiply_by_rate(interest_rate, period)?;
    principal.checked_add(interest)
}

/// clamp a desired repayment to what the loan can actually absorb
///
/// the floor is one satoshi, the ledger-level minimum; product-level
/// minimum chunks belong to the caller. pure suggestion, never mutates.
pub fn suggested_next_payment(loan: &Loan, desired: Money) -> Result<Money> {
    if loan.status != LoanStatus::Active {
        return Err(MarketError::IllegalTransition {
            operation: "suggested_next_payment",
            status: loan.status,
        });
    }
    if desired < Money::SATOSHI {
        return Err(MarketError::BelowMinimum {
            minimum: Money::SATOSHI,
            provided: desired,
        });
    }

    Ok(desired.min(loan.outstanding_balance()))
}
