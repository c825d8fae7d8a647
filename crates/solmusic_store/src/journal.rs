//! Settlement journal: the purchase workflow's persisted state machine.
//!
//! Payment and bookkeeping are not atomic: the payment is an irreversible
//! network transfer, the bookkeeping a chain of best-effort local and remote
//! writes. The journal records which phase a settlement reached so that a
//! session interrupted after payment can replay *bookkeeping only*, never
//! the payment.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use solmusic_common::{MintId, Result, TrackNft, WalletAddress};

/// Where a settlement currently stands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementPhase {
    /// Inputs validated, nothing submitted yet. Safe to retry from scratch.
    Validated,
    /// Payment confirmed on the network. Retrying from scratch would pay twice.
    Paid,
    /// Bookkeeping started but has not finished.
    BookkeepingPending,
    /// All side effects landed.
    Complete,
    /// Payment confirmed but one or more side effects failed; the purchase
    /// was still reported as successful to the user.
    BookkeepingFailed,
}

impl SettlementPhase {
    /// Phases a resume pass should pick up.
    pub fn needs_bookkeeping(self) -> bool {
        matches!(
            self,
            SettlementPhase::Paid
                | SettlementPhase::BookkeepingPending
                | SettlementPhase::BookkeepingFailed
        )
    }
}

/// One journaled settlement, keyed by the purchased asset's mint id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingSettlement {
    pub mint: MintId,
    /// Snapshot of the asset as it stood before the transfer, so a resume
    /// pass can redo the bookkeeping without refetching the (possibly
    /// already mutated) catalogue record.
    pub nft: TrackNft,
    pub buyer: WalletAddress,
    pub seller: WalletAddress,
    /// Price paid, in SOL.
    pub price: Decimal,
    /// Network signature of the confirmed payment, once there is one.
    pub payment_signature: Option<String>,
    /// Successor mint id, fixed the first time bookkeeping runs so a
    /// replay does not fabricate a second copy record.
    pub new_mint: Option<MintId>,
    pub phase: SettlementPhase,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait SettlementJournal: Send + Sync + 'static {
    /// Insert or overwrite the journal entry for this mint.
    async fn record(&self, job: PendingSettlement) -> Result<()>;

    async fn get(&self, mint: &MintId) -> Result<Option<PendingSettlement>>;

    /// Entries whose bookkeeping has not completed.
    async fn unresolved(&self) -> Result<Vec<PendingSettlement>>;

    async fn remove(&self, mint: &MintId) -> Result<()>;
}

/// Session-scoped journal; entries do not survive the process.
#[derive(Default)]
pub struct InMemorySettlementJournal {
    jobs: RwLock<Vec<PendingSettlement>>,
}

impl InMemorySettlementJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettlementJournal for InMemorySettlementJournal {
    async fn record(&self, job: PendingSettlement) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        jobs.retain(|j| j.mint != job.mint);
        jobs.push(job);
        Ok(())
    }

    async fn get(&self, mint: &MintId) -> Result<Option<PendingSettlement>> {
        Ok(self
            .jobs
            .read()
            .await
            .iter()
            .find(|j| &j.mint == mint)
            .cloned())
    }

    async fn unresolved(&self) -> Result<Vec<PendingSettlement>> {
        Ok(self
            .jobs
            .read()
            .await
            .iter()
            .filter(|j| j.phase.needs_bookkeeping())
            .cloned()
            .collect())
    }

    async fn remove(&self, mint: &MintId) -> Result<()> {
        self.jobs.write().await.retain(|j| &j.mint != mint);
        Ok(())
    }
}
