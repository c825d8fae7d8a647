//! Mint-copy orchestration.
//!
//! Minting a copy of a catalogued track costs a flat fee, split 80/20
//! between the original creator and the platform. Unlike the purchase
//! flow's best-effort re-mint, the on-chain creation here is the product
//! being paid for: if it fails after the fee confirmed, the operation
//! fails with a distinct error and there is no refund path.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};

use solmusic_common::{MarketError, MintId, Result, TrackNft, TransactionRecord, TxKind};
use solmusic_store::{CatalogCache, HistoryStore};

use crate::config::MarketConfig;
use crate::fees::{mint_copy_split, resolve_payee, validate_party};
use crate::minter::{AssetMinter, MintSpec};
use crate::profile::ProfileSync;
use crate::progress::{ProgressSink, ProgressStep};
use crate::registry::{pin_catalog_record, AssetRegistry};
use crate::wallet::{LedgerClient, PaymentTransaction, TxSignature, WalletSigner};

/// Outcome of a successful mint copy.
#[derive(Clone, Debug)]
pub struct MintCopyReceipt {
    /// Signature of the confirmed fee payment.
    pub payment_signature: TxSignature,
    /// Identity of the freshly minted copy: the on-chain address when the
    /// backend returned one, otherwise a locally fabricated `copy-…` id.
    pub mint: MintId,
    pub warnings: Vec<String>,
}

pub struct MintCopyOrchestrator<L, R, M>
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
    progress: Arc<dyn ProgressSink>,
    profiles: ProfileSync<R>,
    config: Arc<MarketConfig>,
}

impl<L, R, M> MintCopyOrchestrator<L, R, M>
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
            progress,
            profiles,
            config,
        }
    }

    /// Mint a copy of `nft` owned by the connected wallet.
    #[instrument(skip_all, fields(mint = %nft.mint))]
    pub async fn mint_copy<W: WalletSigner>(
        &self,
        wallet: &W,
        nft: &TrackNft,
    ) -> Result<MintCopyReceipt> {
        match self.mint_copy_inner(wallet, nft).await {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                self.progress.step(ProgressStep::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    async fn mint_copy_inner<W: WalletSigner>(
        &self,
        wallet: &W,
        nft: &TrackNft,
    ) -> Result<MintCopyReceipt> {
        self.progress.step(ProgressStep::Preparing);

        validate_party("creator", &nft.creator)?;

        let cfg = &self.config;
        let caller = wallet.address();
        let split = mint_copy_split(cfg.payment.mint_fee_sol, nft.creator.is_unknown());

        // On-chain creation costs well more than a plain transfer, hence
        // the larger buffer.
        let required = split.total().saturating_add(cfg.payment.mint_gas_buffer);
        let available = self.ledger.balance(&caller).await?;
        if available < required {
            return Err(MarketError::InsufficientFunds {
                required,
                available,
            });
        }

        let blockhash = self.ledger.latest_blockhash().await?;
        let creator = resolve_payee(&nft.creator, &cfg.platform.placeholder_address);

        let mut tx = PaymentTransaction::new(caller.clone(), blockhash.clone());
        tx.push_leg(creator, split.counterparty);
        tx.push_leg(cfg.platform.address.clone(), split.platform);
        match serde_json::to_string(&json!({
            "action": "mint_copy",
            "title": nft.title,
            "origin": nft.mint,
        })) {
            Ok(memo) => tx.memo = Some(memo),
            Err(err) => warn!(%err, "memo skipped"),
        }

        self.progress.step(ProgressStep::AwaitingSignature);
        let signed = wallet.sign(tx).await?;

        self.progress.step(ProgressStep::Submitting);
        let payment_signature = self.ledger.submit(&signed).await?;

        self.progress.step(ProgressStep::Confirming);
        self.ledger.confirm(&payment_signature, &blockhash).await?;
        info!(%payment_signature, lamports = split.total(), "mint fee confirmed");

        // The fee is spent; from here a creation failure is its own error
        // kind so callers can tell "paid but got nothing" apart from an
        // aborted payment.
        self.progress.step(ProgressStep::MintingOnChain);
        let spec = MintSpec::for_track(nft, caller.clone(), cfg.platform.royalty_bps);
        let minted = match self.minter.create_asset(spec).await {
            Ok(minted) => minted,
            Err(err @ MarketError::MintingFailed(_)) => return Err(err),
            Err(other) => return Err(MarketError::MintingFailed(other.to_string())),
        };

        let copy_mint = minted
            .address
            .map(MintId::new)
            .unwrap_or_else(|| MintId::derived_copy(&nft.mint));
        let copy = nft.transferred_to(caller.clone(), copy_mint.clone());

        let mut warnings = Vec::new();
        if let Err(err) = pin_catalog_record(self.registry.as_ref(), &copy).await {
            warn!(%err, "copy record not pinned");
            warnings.push(format!("copy record not pinned: {err}"));
        }

        self.progress.step(ProgressStep::RecordingHistory);
        let record = TransactionRecord {
            kind: TxKind::Mint,
            nft: copy.clone(),
            price: cfg.payment.mint_fee_sol,
            date: Utc::now(),
            other_party: nft.creator.clone(),
        };
        if let Err(err) = self.history.append(record.clone()).await {
            warn!(%err, "mint record not written");
            warnings.push(format!("mint record not written: {err}"));
        }
        self.cache.invalidate().await;

        if let Err(err) = self.profiles.record(&caller, &record, Some(&copy_mint)).await {
            warn!(%err, "minter profile not updated");
            warnings.push(format!("minter profile not updated: {err}"));
        }

        self.progress.step(ProgressStep::Succeeded(format!(
            "minted a copy of {} as {}",
            nft.title, copy_mint
        )));
        Ok(MintCopyReceipt {
            payment_signature,
            mint: copy_mint,
            warnings,
        })
    }
}
