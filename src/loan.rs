use chrono::{DateTime, Months, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{MarketError, Result};
use crate::events::{Event, EventStore};
use crate::types::{LoanId, LoanStatus, RepaymentRecord};

/// a matched, funded borrowing/lending agreement
///
/// state machine: pending -> active -> {repaid, defaulted},
/// pending -> cancelled. terminal states admit nothing further.
///
/// the total obligation is computed once at activation and frozen, so every
/// repayment is judged against a stable target with no rounding drift from
/// recomputation. invariants held at all times:
/// `amount_repaid <= total_obligation`, status is Repaid exactly when they
/// are equal, and the repayment history sums to `amount_repaid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub borrower_id: String,
    pub lender_id: String,

    // terms copied from the matched listings
    pub principal: Money,
    pub interest_rate: Rate,
    pub duration_months: u32,
    pub requires_collateral: bool,

    pub status: LoanStatus,
    pub total_obligation: Option<Money>,
    pub amount_repaid: Money,
    pub repayments: Vec<RepaymentRecord>,

    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// create a pending loan with the agreed terms
    pub fn new(
        borrower_id: String,
        lender_id: String,
        principal: Money,
        interest_rate: Rate,
        duration_months: u32,
        requires_collateral: bool,
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
            borrower_id,
            lender_id,
            principal,
            interest_rate,
            duration_months,
            requires_collateral,
            status: LoanStatus::Pending,
            total_obligation: None,
            amount_repaid: Money::ZERO,
            repayments: Vec::new(),
            created_at: time_provider.now(),
            activated_at: None,
            due_at: None,
            closed_at: None,
        })
    }

    /// activate a pending loan, freezing its total obligation
    ///
    /// obligation = principal * (1 + rate/100 * months/12), simple interest
    /// with the rate annualized, rounded half-up to one satoshi.
    pub fn activate(
        &mut self,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        if self.status != LoanStatus::Pending {
            return Err(MarketError::IllegalTransition {
                operation: "activate",
                status: self.status,
            });
        }

        let period = Decimal::from(self.duration_months) / Decimal::from(12);
        let interest = self.principal.multiply_by_rate(self.interest_rate, period)?;
        let total = self.principal.checked_add(interest)?;

        let now = time_provider.now();
        let due_at = now + Months::new(self.duration_months);

        self.total_obligation = Some(total);
        self.activated_at = Some(now);
        self.due_at = Some(due_at);
        self.status = LoanStatus::Active;

        events.emit(Event::LoanActivated {
            loan_id: self.id,
            total_obligation: total,
            due_at,
            timestamp: now,
        });

        Ok(())
    }

    /// cancel a pending loan before activation
    pub fn cancel(
        &mut self,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        if self.status != LoanStatus::Pending {
            return Err(MarketError::IllegalTransition {
                operation: "cancel",
                status: self.status,
            });
        }

        let now = time_provider.now();
        self.status = LoanStatus::Cancelled;
        self.closed_at = Some(now);

        events.emit(Event::LoanCancelled {
            loan_id: self.id,
            timestamp: now,
        });

        Ok(())
    }

    /// record a repayment against an active loan
    ///
    /// fails without touching state if the amount is zero or would exceed
    /// the outstanding balance; the caller resubmits a corrected amount,
    /// the ledger never clamps. an exact final payment transitions the
    /// loan to repaid.
    pub fn record_repayment(
        &mut self,
        amount: Money,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        if self.status != LoanStatus::Active {
            return Err(MarketError::IllegalTransition {
                operation: "record_repayment",
                status: self.status,
            });
        }
        if amount.is_zero() {
            return Err(MarketError::InvalidAmount {
                amount: amount.to_string(),
            });
        }

        let total = self.obligation()?;
        let outstanding = total.checked_sub(self.amount_repaid)?;
        if amount > outstanding {
            return Err(MarketError::OverRepayment {
                outstanding,
                requested: amount,
            });
        }

        let now = time_provider.now();
        self.repayments.push(RepaymentRecord {
            amount,
            timestamp: now,
        });
        self.amount_repaid += amount;

        events.emit(Event::RepaymentRecorded {
            loan_id: self.id,
            amount,
            amount_repaid: self.amount_repaid,
            outstanding: total.checked_sub(self.amount_repaid)?,
            timestamp: now,
        });

        if self.amount_repaid == total {
            self.status = LoanStatus::Repaid;
            self.closed_at = Some(now);
            events.emit(Event::LoanRepaid {
                loan_id: self.id,
                total_repaid: self.amount_repaid,
                timestamp: now,
            });
        }

        Ok(())
    }

    /// move an overdue active loan to defaulted
    ///
    /// the due-date scan lives outside the core; this only validates and
    /// applies the transition when asked.
    pub fn mark_defaulted(
        &mut self,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        if self.status != LoanStatus::Active {
            return Err(MarketError::IllegalTransition {
                operation: "mark_defaulted",
                status: self.status,
            });
        }

        let now = time_provider.now();
        let due_at = self.due_at.ok_or(MarketError::IllegalTransition {
            operation: "mark_defaulted",
            status: self.status,
        })?;
        if now <= due_at {
            return Err(MarketError::NotPastDue {
                due_at,
                current_time: now,
            });
        }

        let outstanding = self.outstanding_balance();
        self.status = LoanStatus::Defaulted;
        self.closed_at = Some(now);

        events.emit(Event::LoanDefaulted {
            loan_id: self.id,
            outstanding,
            timestamp: now,
        });

        Ok(())
    }

    /// remaining balance, zero for loans that never activated
    pub fn outstanding_balance(&self) -> Money {
        match self.total_obligation {
            Some(total) => total.checked_sub(self.amount_repaid).unwrap_or(Money::ZERO),
            None => Money::ZERO,
        }
    }

    fn obligation(&self) -> Result<Money> {
        self.total_obligation.ok_or(MarketError::IllegalTransition {
            operation: "record_repayment",
            status: self.status,
        })
    }
}
