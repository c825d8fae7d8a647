//! Wallet and ledger ports.
//!
//! The orchestrators never talk to a concrete wallet adapter or RPC node;
//! they are wired against these two traits so hosts can plug in whatever
//! the runtime provides and tests can observe every submission.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use solmusic_common::{Lamports, Result, WalletAddress};

/// A recent blockhash together with its expiry height, fetched once per
/// payment and used both to build and to confirm the transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blockhash {
    pub hash: String,
    pub last_valid_block_height: u64,
}

/// One lamport transfer inside a payment transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLeg {
    pub to: WalletAddress,
    pub lamports: Lamports,
}

/// A single unsigned payment: a handful of transfer legs plus an optional
/// memo, paid for by `fee_payer`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub fee_payer: WalletAddress,
    pub recent_blockhash: Blockhash,
    pub legs: Vec<TransferLeg>,
    pub memo: Option<String>,
}

impl PaymentTransaction {
    pub fn new(fee_payer: WalletAddress, recent_blockhash: Blockhash) -> Self {
        Self {
            fee_payer,
            recent_blockhash,
            legs: Vec::new(),
            memo: None,
        }
    }

    /// Append a transfer leg. Zero-lamport legs are omitted, matching the
    /// conditional instruction construction of the payment builder.
    pub fn push_leg(&mut self, to: WalletAddress, lamports: Lamports) {
        if lamports > 0 {
            self.legs.push(TransferLeg { to, lamports });
        }
    }

    /// Total lamports moved out of the fee payer, gas excluded.
    pub fn total_lamports(&self) -> Lamports {
        self.legs.iter().map(|leg| leg.lamports).sum()
    }
}

/// A payment after the wallet signed it. The signature bytes are opaque to
/// the orchestrators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx: PaymentTransaction,
    pub wallet_signature: Vec<u8>,
}

/// Network signature identifying a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxSignature(String);

impl TxSignature {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The connected wallet. Signing is a suspension point: the call does not
/// return until the user approved or declined in the wallet UI.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> WalletAddress;

    /// A declined request surfaces as [`solmusic_common::MarketError::WalletRejected`].
    async fn sign(&self, tx: PaymentTransaction) -> Result<SignedTransaction>;
}

/// RPC-node port covering the four calls the payment path needs.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn balance(&self, addr: &WalletAddress) -> Result<Lamports>;

    async fn latest_blockhash(&self) -> Result<Blockhash>;

    /// Broadcast a signed transaction. A transport failure surfaces as
    /// [`solmusic_common::MarketError::Network`].
    async fn submit(&self, tx: &SignedTransaction) -> Result<TxSignature>;

    /// Wait for finality. An execution error reported by the network
    /// surfaces as [`solmusic_common::MarketError::Confirmation`]; the
    /// transfer may or may not have landed and no rollback is possible.
    async fn confirm(&self, sig: &TxSignature, blockhash: &Blockhash) -> Result<()>;
}
