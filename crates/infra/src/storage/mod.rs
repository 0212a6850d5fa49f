//! SQLite persistence for the register

mod pending;

pub use pending::PendingTransactionRepository;
