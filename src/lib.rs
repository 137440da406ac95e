pub mod decimal;
pub mod errors;
pub mod events;
pub mod listing;
pub mod loan;
pub mod marketplace;
pub mod repayment;
pub mod types;

// re-export key types
pub use decimal::{Money, Rate, BTC_SCALE};
pub use errors::{MarketError, Result};
pub use events::{Event, EventStore};
pub use listing::LoanListing;
pub use loan::Loan;
pub use marketplace::{ListingFilter, Marketplace};
pub use repayment::{projected_total_obligation, suggested_next_payment};
pub use types::{ListingId, ListingKind, LoanId, LoanStatus, RepaymentRecord};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
