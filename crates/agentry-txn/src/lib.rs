//! # agentry-txn
//!
//! Transactional execution for agentry tools.
//!
//! ## Overview
//!
//! - `ReversibleAction` pairs an execute function with a reverse function
//!   and remembers its most recent successful run so it can be undone.
//! - `ActionTransaction` runs a queue of reversible actions in order. If any
//!   of them fails, the ones that already succeeded are undone last-in
//!   first-out before the failure is returned. Every run is undone from its
//!   own record, so the same action may be queued more than once.
//! - `StagedActionEnvironment` holds transactions for review, so a batch can
//!   be inspected, then approved or rejected before any side effect occurs.
//! - `tools::staging_actions` exposes staging to an agent as ordinary actions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agentry_txn::{ActionTransaction, ReversibleAction};
//!
//! let mut txn = ActionTransaction::new();
//! txn.add(debit.clone(), args)?;
//! txn.add(credit.clone(), args)?;
//! match txn.execute() {
//!     Ok(outcome) => txn.commit(),
//!     Err(AgentError::TransactionFailure { .. }) => { /* already rolled back */ }
//!     Err(other) => return Err(other),
//! }
//! ```

pub mod reversible;
pub mod staged;
pub mod tools;
pub mod transaction;

pub use reversible::{ReversalRecord, ReversibleAction};
pub use staged::{ReviewStep, StagedActionEnvironment, TransactionReview, SAFETY_QUESTIONS};
pub use transaction::{
    ActionTransaction, ExecutedStep, RollbackReport, TransactionOutcome, TransactionStatus,
    TransactionSummary,
};
