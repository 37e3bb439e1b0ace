//! Process-local cache of ledger session views.

mod store;

pub use store::{RefreshTicket, SessionSnapshot, SessionStateStore};
