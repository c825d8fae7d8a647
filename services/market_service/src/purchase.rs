//! Purchase orchestration.
//!
//! One invocation moves funds at most once. The flow validates, splits the
//! price, pre-checks the balance, builds and signs a single payment
//! transaction, submits and confirms it, then runs a chain of unguarded
//! bookkeeping side effects. Bookkeeping failures never fail the purchase:
//! the payment already confirmed, so the receipt reports success with
//! warnings and the journal keeps the entry replayable via [`PurchaseOrchestrator::resume`].

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use solmusic_common::{
    MarketError, MintId, Result, TrackNft, TransactionRecord, TxKind, WalletAddress,
};
use solmusic_store::{
    CatalogCache, HistoryStore, PendingSettlement, SettlementJournal, SettlementPhase,
};

use crate::config::MarketConfig;
use crate::fees::{purchase_split, resolve_payee, validate_party};
use crate::minter::{AssetMinter, MintSpec};
use crate::profile::ProfileSync;
use crate::progress::{ProgressSink, ProgressStep};
use crate::registry::{pin_catalog_record, AssetRegistry};
use crate::wallet::{LedgerClient, PaymentTransaction, TxSignature, WalletSigner};

/// Outcome of a successful purchase. `warnings` is non-empty when one or
/// more post-payment side effects failed.
#[derive(Clone, Debug)]
pub struct PurchaseReceipt {
    pub signature: TxSignature,
    pub phase: SettlementPhase,
    /// Mint id of the successor record now owned by the buyer.
    pub new_mint: MintId,
    pub warnings: Vec<String>,
}

pub struct PurchaseOrchestrator<L, R, M>
where
    L: LedgerClient,
    R: AssetRegistry,
    M: AssetMinter,
{
    ledger: Arc<L>,
    registry: Arc<R>,
    minter: Arc<M>,
    cache: Arc<dyn CatalogCache>,
    history: Arc<dyn HistoryStore>,
    journal: Arc<dyn SettlementJournal>,
    progress: Arc<dyn ProgressSink>,
    profiles: ProfileSync<R>,
    config: Arc<MarketConfig>,
}

impl<L, R, M> PurchaseOrchestrator<L, R, M>
where
    L: LedgerClient + 'static,
    R: AssetRegistry + 'static,
    M: AssetMinter + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<L>,
        registry: Arc<R>,
        minter: Arc<M>,
        cache: Arc<dyn CatalogCache>,
        history: Arc<dyn HistoryStore>,
        journal: Arc<dyn SettlementJournal>,
        progress: Arc<dyn ProgressSink>,
        config: Arc<MarketConfig>,
    ) -> Self {
        let profiles = ProfileSync::new(registry.clone(), history.clone());
        Self {
            ledger,
            registry,
            minter,
            cache,
            history,
            journal,
            progress,
            profiles,
            config,
        }
    }

    /// Buy `nft` with the connected wallet.
    ///
    /// At most one payment is submitted per invocation. Errors raised
    /// before the signature step leave no trace and are safe to retry;
    /// a [`MarketError::Confirmation`] means the network reported an
    /// execution failure after broadcast and nothing can be rolled back.
    #[instrument(skip_all, fields(mint = %nft.mint, price = %nft.price))]
    pub async fn buy<W: WalletSigner>(
        &self,
        wallet: &W,
        nft: &TrackNft,
    ) -> Result<PurchaseReceipt> {
        match self.buy_inner(wallet, nft).await {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                self.progress.step(ProgressStep::Failed(err.to_string()));
                // A journal entry still in Validated is pre-payment litter,
                // unless the failure was an ambiguous confirmation result.
                if !matches!(err, MarketError::Confirmation(_)) {
                    if let Ok(Some(job)) = self.journal.get(&nft.mint).await {
                        if job.phase == SettlementPhase::Validated {
                            let _ = self.journal.remove(&nft.mint).await;
                        }
                    }
                }
                Err(err)
            }
        }
    }

    async fn buy_inner<W: WalletSigner>(
        &self,
        wallet: &W,
        nft: &TrackNft,
    ) -> Result<PurchaseReceipt> {
        self.progress.step(ProgressStep::Preparing);

        validate_party("owner", &nft.owner)?;
        validate_party("creator", &nft.creator)?;

        let buyer = wallet.address();
        let cfg = &self.config;
        let split = purchase_split(nft.price, nft.owner.is_unknown(), cfg.platform.fee_percent);

        // Saturating: a price at the top of the lamport range must read as
        // unaffordable, not wrap around the balance check.
        let required = split.total().saturating_add(cfg.payment.transfer_gas_buffer);
        let available = self.ledger.balance(&buyer).await?;
        if available < required {
            return Err(MarketError::InsufficientFunds {
                required,
                available,
            });
        }

        let blockhash = self.ledger.latest_blockhash().await?;
        let seller = resolve_payee(&nft.owner, &cfg.platform.placeholder_address);

        let mut tx = PaymentTransaction::new(buyer.clone(), blockhash.clone());
        tx.push_leg(seller, split.counterparty);
        tx.push_leg(cfg.platform.address.clone(), split.platform);
        match purchase_memo(nft, &buyer) {
            Ok(memo) => tx.memo = Some(memo),
            Err(err) => warn!(%err, "memo skipped"),
        }

        let mut job = PendingSettlement {
            mint: nft.mint.clone(),
            nft: nft.clone(),
            buyer: buyer.clone(),
            seller: nft.owner.clone(),
            price: nft.price,
            payment_signature: None,
            new_mint: None,
            phase: SettlementPhase::Validated,
            updated_at: Utc::now(),
        };
        self.journal.record(job.clone()).await?;

        self.progress.step(ProgressStep::AwaitingSignature);
        let signed = wallet.sign(tx).await?;

        self.progress.step(ProgressStep::Submitting);
        let signature = self.ledger.submit(&signed).await?;

        self.progress.step(ProgressStep::Confirming);
        self.ledger.confirm(&signature, &blockhash).await?;
        info!(%signature, lamports = split.total(), "payment confirmed");

        // Past this point the payment is final: a journal outage joins the
        // warnings like every other bookkeeping failure, it never fails the
        // purchase.
        let mut warnings = Vec::new();
        job.payment_signature = Some(signature.to_string());
        job.phase = SettlementPhase::Paid;
        job.updated_at = Utc::now();
        if let Err(err) = self.journal.record(job.clone()).await {
            warn!(%err, "journal update failed");
            warnings.push(format!("journal update failed: {err}"));
        }

        let new_mint = self.apply_bookkeeping(&mut job, &mut warnings).await;

        let phase = if warnings.is_empty() {
            SettlementPhase::Complete
        } else {
            SettlementPhase::BookkeepingFailed
        };
        job.phase = phase;
        job.updated_at = Utc::now();
        if let Err(err) = self.journal.record(job).await {
            warn!(%err, "journal update failed");
            warnings.push(format!("journal update failed: {err}"));
        }

        self.progress.step(ProgressStep::Succeeded(format!(
            "purchased {} for {} SOL",
            nft.title, nft.price
        )));
        Ok(PurchaseReceipt {
            signature,
            phase,
            new_mint,
            warnings,
        })
    }

    /// Replay the bookkeeping of a journaled settlement. The payment step
    /// is never repeated; the entry must already be past it.
    #[instrument(skip_all, fields(mint = %job.mint))]
    pub async fn resume(&self, job: &PendingSettlement) -> Result<PurchaseReceipt> {
        if !job.phase.needs_bookkeeping() {
            return Err(MarketError::Internal(format!(
                "settlement for {} is not awaiting bookkeeping",
                job.mint
            )));
        }
        let signature = job
            .payment_signature
            .clone()
            .map(TxSignature::new)
            .ok_or_else(|| {
                MarketError::Internal(format!("settlement for {} has no payment signature", job.mint))
            })?;

        let mut job = job.clone();
        let mut warnings = Vec::new();
        let new_mint = self.apply_bookkeeping(&mut job, &mut warnings).await;

        let phase = if warnings.is_empty() {
            SettlementPhase::Complete
        } else {
            SettlementPhase::BookkeepingFailed
        };
        job.phase = phase;
        job.updated_at = Utc::now();
        if let Err(err) = self.journal.record(job).await {
            warn!(%err, "journal update failed");
            warnings.push(format!("journal update failed: {err}"));
        }

        Ok(PurchaseReceipt {
            signature,
            phase,
            new_mint,
            warnings,
        })
    }

    /// Resume every journaled settlement still awaiting bookkeeping.
    pub async fn resume_all(&self) -> Result<Vec<PurchaseReceipt>> {
        let mut receipts = Vec::new();
        for job in self.journal.unresolved().await? {
            receipts.push(self.resume(&job).await?);
        }
        Ok(receipts)
    }

    /// The post-payment side-effect chain. Each step is logged and
    /// collected into `warnings` on failure, never propagated: the payment
    /// is already final.
    async fn apply_bookkeeping(
        &self,
        job: &mut PendingSettlement,
        warnings: &mut Vec<String>,
    ) -> MintId {
        let nft = job.nft.clone();
        let buyer = job.buyer.clone();

        job.phase = SettlementPhase::BookkeepingPending;
        let new_mint = job
            .new_mint
            .clone()
            .unwrap_or_else(|| MintId::derived_copy(&nft.mint));
        job.new_mint = Some(new_mint.clone());
        job.updated_at = Utc::now();
        if let Err(err) = self.journal.record(job.clone()).await {
            warn!(%err, "journal update failed");
        }

        // Sell record for the previous owner, skipped entirely when the
        // holder was never recorded.
        let sell_record = (!nft.owner.is_unknown()).then(|| TransactionRecord {
            kind: TxKind::Sell,
            nft: nft.clone(),
            price: job.price,
            date: Utc::now(),
            other_party: buyer.clone(),
        });
        if let Some(sell) = &sell_record {
            if let Err(err) = self.append_history_once(sell).await {
                warn!(%err, "sell record not written");
                warnings.push(format!("sell record not written: {err}"));
            }
        }

        // Ownership rewrite: pin the successor record, drop the stale
        // catalogue and shadow it until the next refetch.
        self.progress.step(ProgressStep::UpdatingOwnership);
        let successor = nft.transferred_to(buyer.clone(), new_mint.clone());
        if let Err(err) = pin_catalog_record(self.registry.as_ref(), &successor).await {
            warn!(%err, "ownership record not pinned");
            warnings.push(format!("ownership record not pinned: {err}"));
        }
        self.cache.invalidate().await;
        self.cache
            .stage_pending(nft.mint.clone(), successor.clone())
            .await;

        // Best-effort re-mint under the buyer. The transfer stands either way.
        self.progress.step(ProgressStep::MintingOnChain);
        let spec = MintSpec::for_track(&successor, buyer.clone(), self.config.platform.royalty_bps);
        match self.minter.create_asset(spec).await {
            Ok(asset) => debug!(address = ?asset.address, "asset re-minted for buyer"),
            Err(err) => {
                warn!(%err, "re-mint failed, transfer stands");
                warnings.push(format!("on-chain re-mint failed: {err}"));
            }
        }

        // Buy record plus profile rewrites for both parties.
        self.progress.step(ProgressStep::RecordingHistory);
        let buy_record = TransactionRecord {
            kind: TxKind::Buy,
            nft: successor.clone(),
            price: job.price,
            date: Utc::now(),
            other_party: nft.owner.clone(),
        };
        if let Err(err) = self.append_history_once(&buy_record).await {
            warn!(%err, "buy record not written");
            warnings.push(format!("buy record not written: {err}"));
        }
        self.cache.invalidate().await;

        if let Err(err) = self
            .profiles
            .record(&buyer, &buy_record, Some(&successor.mint))
            .await
        {
            warn!(%err, "buyer profile not updated");
            warnings.push(format!("buyer profile not updated: {err}"));
        }
        if let Some(sell) = &sell_record {
            if let Err(err) = self.profiles.record(&nft.owner, sell, None).await {
                warn!(%err, "seller profile not updated");
                warnings.push(format!("seller profile not updated: {err}"));
            }
        }

        new_mint
    }

    /// Append a history record unless an equivalent one is already there,
    /// keeping resumed bookkeeping idempotent.
    async fn append_history_once(&self, tx: &TransactionRecord) -> Result<()> {
        let existing = self.history.all().await?;
        let duplicate = existing.iter().any(|t| {
            t.kind == tx.kind && t.nft.mint == tx.nft.mint && t.other_party == tx.other_party
        });
        if duplicate {
            debug!(kind = %tx.kind, mint = %tx.nft.mint, "history record already present");
            return Ok(());
        }
        self.history.append(tx.clone()).await
    }
}

fn purchase_memo(nft: &TrackNft, buyer: &WalletAddress) -> Result<String> {
    Ok(serde_json::to_string(&json!({
        "action": "purchase",
        "title": nft.title,
        "mint": nft.mint,
        "buyer": buyer,
    }))?)
}
