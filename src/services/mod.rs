//! Application services composed from the ledger, spin log and slot machine

pub mod auth;
pub mod game;
pub mod wallet;

pub use auth::AuthService;
pub use game::{GameService, SpinReceipt};
pub use wallet::{Registration, WalletService};
