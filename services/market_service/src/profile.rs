//! Remote profile maintenance.
//!
//! Profiles live in the pinning store as whole-blob JSON pins; every change
//! rewrites the full profile. The sync operation reconciles a wallet's
//! remote profile with the local transaction history, deduplicating on
//! `(kind, mint, date)`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use solmusic_common::{
    MintId, ProfileTransaction, Result, TransactionRecord, UserProfile, WalletAddress,
};
use solmusic_store::HistoryStore;

use crate::registry::AssetRegistry;

pub struct ProfileSync<R: AssetRegistry> {
    registry: Arc<R>,
    history: Arc<dyn HistoryStore>,
}

impl<R: AssetRegistry> ProfileSync<R> {
    pub fn new(registry: Arc<R>, history: Arc<dyn HistoryStore>) -> Self {
        Self { registry, history }
    }

    /// Fetch the wallet's profile, creating a fresh one if none is pinned.
    pub async fn ensure_profile(
        &self,
        wallet: &WalletAddress,
        username: &str,
    ) -> Result<UserProfile> {
        match self.registry.fetch_profile(wallet).await? {
            Some(profile) => Ok(profile),
            None => Ok(UserProfile::new(wallet.clone(), username)),
        }
    }

    /// Record one transaction (and optionally a newly owned mint) into the
    /// wallet's profile and rewrite it.
    pub async fn record(
        &self,
        wallet: &WalletAddress,
        tx: &TransactionRecord,
        owned: Option<&MintId>,
    ) -> Result<()> {
        let mut profile = self.ensure_profile(wallet, wallet.as_str()).await?;

        let entry = ProfileTransaction::from(tx);
        if !profile
            .transactions
            .iter()
            .any(|t| t.merge_key() == entry.merge_key())
        {
            profile.transactions.push(entry);
        }
        if let Some(mint) = owned {
            if !profile.owned_mints.contains(mint) {
                profile.owned_mints.push(mint.clone());
            }
        }
        profile.last_updated = Utc::now();

        self.registry.save_profile(&profile).await
    }

    /// Merge the local history into the remote profile and rewrite it.
    ///
    /// The union is keyed on `(kind, mint, date)`; remote entries win on a
    /// collision since they were already published. Returns the merged
    /// profile.
    #[instrument(skip(self), fields(wallet = %wallet))]
    pub async fn sync(&self, wallet: &WalletAddress, username: &str) -> Result<UserProfile> {
        let mut profile = self.ensure_profile(wallet, username).await?;

        let local = self.history.for_wallet(wallet).await?;
        let before = profile.transactions.len();
        for tx in local.sold.iter().chain(local.purchased.iter()) {
            let entry = ProfileTransaction::from(tx);
            if !profile
                .transactions
                .iter()
                .any(|t| t.merge_key() == entry.merge_key())
            {
                profile.transactions.push(entry);
            }
        }
        for tx in &local.purchased {
            if !profile.owned_mints.contains(&tx.nft.mint) {
                profile.owned_mints.push(tx.nft.mint.clone());
            }
        }
        profile.transactions.sort_by_key(|t| t.date);
        profile.last_updated = Utc::now();

        self.registry.save_profile(&profile).await?;
        info!(
            merged = profile.transactions.len() - before,
            total = profile.transactions.len(),
            "profile synced"
        );
        Ok(profile)
    }
}
