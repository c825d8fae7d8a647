//! Shared domain types and error handling for the SolMusic market client.
//!
//! Everything here is serde-serialisable and free of I/O so it can be reused
//! by the local stores, the orchestrators and any outer surface alike.

pub mod error;
pub mod types;

pub use error::{MarketError, Result};
pub use types::{
    Lamports, MintId, ProfileTransaction, TrackNft, TransactionRecord, TxKind, UserProfile,
    WalletAddress, LAMPORTS_PER_SOL,
};
