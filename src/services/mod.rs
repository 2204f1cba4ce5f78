//! Business logic behind the HTTP handlers

pub mod callback_processor;
pub mod deposits;
pub mod ledger;
pub mod tasks;
pub mod team;
pub mod transactions;
pub mod users;
pub mod withdrawals;

pub use callback_processor::{CallbackError, CallbackOutcome, CallbackProcessor};
pub use ledger::{LedgerOutcome, LedgerService};
