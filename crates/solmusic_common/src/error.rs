//! Centralised error handling for the SolMusic market client.
//!
//! Every crate in the workspace depends on `solmusic_common` and uses
//! `MarketError`/`Result` instead of rolling its own error types, so errors
//! can cross the store/orchestrator boundary without re-mapping.
//!
//! Variants are the tagged taxonomy the workflows rely on: callers branch on
//! the *kind*, never on message substrings. The split between pre-payment
//! and post-payment failures is load-bearing; see [`MarketError::is_safe_to_retry`].

use thiserror::Error;

use crate::types::Lamports;

/// A convenient `Result` alias tied to [`MarketError`].
pub type Result<T, E = MarketError> = std::result::Result<T, E>;

/// Top-level application error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MarketError {
    /// Malformed owner/creator/platform address on a catalogue record.
    #[error("invalid {field} address: {value}")]
    AddressInvalid { field: String, value: String },

    /// Pre-flight balance check failed; nothing was submitted.
    #[error("insufficient funds: need {required} lamports, have {available}")]
    InsufficientFunds {
        required: Lamports,
        available: Lamports,
    },

    /// The user declined the signature request in the wallet UI, or signing
    /// failed inside the wallet.
    #[error("transaction rejected by wallet")]
    WalletRejected,

    /// Broadcast or RPC failure reported by the network client.
    #[error("network error: {0}")]
    Network(String),

    /// The network executed the transaction and reported an error. The
    /// payment may or may not have landed; no rollback is possible.
    #[error("transaction failed: {0}")]
    Confirmation(String),

    /// On-chain asset creation failed after the fee payment confirmed.
    /// The caller has paid with no asset produced; there is no refund path.
    #[error("minting failed: {0}")]
    MintingFailed(String),

    /// A post-payment side effect (history write, ownership rewrite,
    /// profile rewrite) failed. The payment itself already confirmed.
    #[error("bookkeeping error: {0}")]
    Bookkeeping(String),

    /// Pinning/storage service failure.
    #[error("registry error: {0}")]
    Registry(String),

    /// Revision mismatch on a compare-and-put against the local cache.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic catch-all for errors we don't categorise yet.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MarketError {
    /// Whether a fresh attempt of the *whole* workflow is safe.
    ///
    /// Only errors raised before any funds move qualify. Post-payment
    /// failures must go through the resume path instead: retrying the full
    /// flow would submit a second payment.
    pub fn is_safe_to_retry(&self) -> bool {
        matches!(
            self,
            MarketError::AddressInvalid { .. }
                | MarketError::InsufficientFunds { .. }
                | MarketError::WalletRejected
                | MarketError::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_payment_errors_are_retryable() {
        assert!(MarketError::WalletRejected.is_safe_to_retry());
        assert!(MarketError::InsufficientFunds {
            required: 10,
            available: 1
        }
        .is_safe_to_retry());
        assert!(MarketError::AddressInvalid {
            field: "owner".into(),
            value: "bogus".into()
        }
        .is_safe_to_retry());
    }

    #[test]
    fn post_payment_errors_are_not() {
        assert!(!MarketError::Confirmation("custom program error".into()).is_safe_to_retry());
        assert!(!MarketError::MintingFailed("backend down".into()).is_safe_to_retry());
        assert!(!MarketError::Bookkeeping("profile write failed".into()).is_safe_to_retry());
    }
}
