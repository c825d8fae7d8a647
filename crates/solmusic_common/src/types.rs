//! Canonical, cross-crate types for the SolMusic market client.
//!
//! This module is **dependency-light** and **stable**, making it safe to be
//! imported by every crate in the workspace: the local stores, the market
//! orchestrators and any outer surface wired on top of them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MarketError;

// ----------------------------------------------------------------------------
// Simple aliases
// ----------------------------------------------------------------------------

/// Amount in the network's smallest unit.
pub type Lamports = u64;

/// Lamports per one whole SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

// ----------------------------------------------------------------------------
// Primitive new-types
// ----------------------------------------------------------------------------

/// A wallet address on the ledger, or the `"unknown"` sentinel used by
/// catalogue records whose holder was never recorded.
///
/// Valid addresses are base58-like: 32 to 44 alphanumeric characters.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// The literal stored in catalogue records for an unrecorded holder.
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_owned())
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    /// Whether this is either the sentinel or a well-formed on-ledger address.
    pub fn is_valid(&self) -> bool {
        self.is_unknown() || Self::looks_like_address(&self.0)
    }

    fn looks_like_address(raw: &str) -> bool {
        (32..=44).contains(&raw.len()) && raw.chars().all(|c| c.is_ascii_alphanumeric())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr = Self::new(s);
        if addr.is_valid() {
            Ok(addr)
        } else {
            Err(MarketError::AddressInvalid {
                field: "address".into(),
                value: s.into(),
            })
        }
    }
}

/// The stable string key distinguishing one asset copy from another.
///
/// Every transfer creates a *new* record with a *new* mint id; the previous
/// record is never edited or deleted, only stops being the latest.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MintId(String);

impl MintId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Fresh random identifier for a newly created asset.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Fabricated identifier for a copy of `origin`, used when no on-chain
    /// address is available: `copy-<millis>-<rand4>-<origin>`.
    pub fn derived_copy(origin: &MintId) -> Self {
        let salt: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(4)
            .map(char::from)
            .collect();
        Self(format!(
            "copy-{}-{}-{}",
            Utc::now().timestamp_millis(),
            salt,
            origin.0
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ----------------------------------------------------------------------------
// Catalogue records
// ----------------------------------------------------------------------------

/// A catalogued audio+image asset.
///
/// `mint` is the only stable identity; `owner` changes on every successful
/// purchase or mint-copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackNft {
    pub title: String,
    pub artist: String,
    pub cover_art: String,
    pub audio_url: String,
    /// Listing price in SOL.
    pub price: Decimal,
    pub for_sale: bool,
    pub mint: MintId,
    pub owner: WalletAddress,
    pub creator: WalletAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TrackNft {
    /// The successor record produced by a transfer: same content, new owner,
    /// new mint identity.
    pub fn transferred_to(&self, new_owner: WalletAddress, new_mint: MintId) -> Self {
        Self {
            owner: new_owner,
            mint: new_mint,
            created_at: Some(Utc::now()),
            ..self.clone()
        }
    }
}

// ----------------------------------------------------------------------------
// Transaction history
// ----------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Buy,
    Sell,
    Mint,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxKind::Buy => f.write_str("buy"),
            TxKind::Sell => f.write_str("sell"),
            TxKind::Mint => f.write_str("mint"),
        }
    }
}

/// One entry in the local transaction history.
///
/// `nft` is a snapshot taken at transaction time, not a live reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub kind: TxKind,
    pub nft: TrackNft,
    /// Price paid, in SOL.
    pub price: Decimal,
    pub date: DateTime<Utc>,
    /// The counter-party wallet (possibly the `"unknown"` sentinel).
    pub other_party: WalletAddress,
}

// ----------------------------------------------------------------------------
// User profile
// ----------------------------------------------------------------------------

/// Flat per-transaction form stored inside a remote profile blob.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileTransaction {
    pub kind: TxKind,
    pub nft_mint: MintId,
    pub nft_title: String,
    pub nft_artist: String,
    pub price: Decimal,
    pub date: DateTime<Utc>,
    pub other_party: WalletAddress,
}

impl From<&TransactionRecord> for ProfileTransaction {
    fn from(tx: &TransactionRecord) -> Self {
        Self {
            kind: tx.kind,
            nft_mint: tx.nft.mint.clone(),
            nft_title: tx.nft.title.clone(),
            nft_artist: tx.nft.artist.clone(),
            price: tx.price,
            date: tx.date,
            other_party: tx.other_party.clone(),
        }
    }
}

impl ProfileTransaction {
    /// Deduplication key used when merging local and remote histories.
    pub fn merge_key(&self) -> (TxKind, MintId, DateTime<Utc>) {
        (self.kind, self.nft_mint.clone(), self.date)
    }
}

/// Remote profile blob keyed by wallet address.
///
/// Profiles are rewritten wholesale on every change, never patched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub wallet_address: WalletAddress,
    pub profile_created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub owned_mints: Vec<MintId>,
    pub transactions: Vec<ProfileTransaction>,
}

impl UserProfile {
    pub fn new(wallet_address: WalletAddress, username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            username: username.into(),
            wallet_address,
            profile_created: now,
            last_updated: now,
            owned_mints: Vec::new(),
            transactions: Vec::new(),
        }
    }
}
