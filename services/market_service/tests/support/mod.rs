//! In-memory doubles for the orchestrator integration tests.
//!
//! Every collaborator port gets a deterministic mock; the ledger double
//! records each submission so tests can assert exactly how many payments
//! left the wallet.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};

use market_service::config::MarketConfig;
use market_service::minter::{AssetMinter, MintSpec, MintedAsset};
use market_service::registry::{catalog_keyvalues, AssetRegistry, PinnedItem};
use market_service::wallet::{
    Blockhash, LedgerClient, PaymentTransaction, SignedTransaction, TxSignature, WalletSigner,
};
use market_service::{LogProgress, MintCopyOrchestrator, PurchaseOrchestrator};
use solmusic_common::{
    Lamports, MarketError, MintId, Result, TrackNft, UserProfile, WalletAddress,
};
use solmusic_store::{
    CatalogCache, HistoryStore, InMemoryCatalogCache, InMemoryHistoryStore,
    InMemorySettlementJournal, PendingSettlement, SettlementJournal, SettlementPhase,
};

pub const BUYER: &str = "4Nd1mY6eBuyerBuyerBuyerBuyerBuyerBuyer01";
pub const SECOND_BUYER: &str = "7hKp3rOtherOtherOtherOtherOtherOtherOt03";
pub const SELLER: &str = "9wZx7qSellerSellerSellerSellerSellerSe02";
pub const CREATOR: &str = "2cFv5tMakerMakerMakerMakerMakerMakerMa04";

// Install a test logger once for the whole test binary.
static LOG_HANDLE: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
});

// ----------------------------------------------------------------------------
// Wallet
// ----------------------------------------------------------------------------

pub struct MockWallet {
    pub addr: WalletAddress,
    pub reject: bool,
}

impl MockWallet {
    pub fn new(addr: &str) -> Self {
        Self {
            addr: WalletAddress::new(addr),
            reject: false,
        }
    }

    pub fn rejecting(addr: &str) -> Self {
        Self {
            addr: WalletAddress::new(addr),
            reject: true,
        }
    }
}

#[async_trait]
impl WalletSigner for MockWallet {
    fn address(&self) -> WalletAddress {
        self.addr.clone()
    }

    async fn sign(&self, tx: PaymentTransaction) -> Result<SignedTransaction> {
        if self.reject {
            return Err(MarketError::WalletRejected);
        }
        Ok(SignedTransaction {
            tx,
            wallet_signature: vec![0xAB; 64],
        })
    }
}

// ----------------------------------------------------------------------------
// Ledger
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct MockLedger {
    balances: RwLock<HashMap<WalletAddress, Lamports>>,
    pub submitted: Mutex<Vec<PaymentTransaction>>,
    pub fail_confirm: AtomicBool,
    counter: AtomicU64,
}

impl MockLedger {
    pub async fn set_balance(&self, addr: &str, lamports: Lamports) {
        self.balances
            .write()
            .await
            .insert(WalletAddress::new(addr), lamports);
    }

    pub async fn submissions(&self) -> Vec<PaymentTransaction> {
        self.submitted.lock().await.clone()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn balance(&self, addr: &WalletAddress) -> Result<Lamports> {
        Ok(*self.balances.read().await.get(addr).unwrap_or(&0))
    }

    async fn latest_blockhash(&self) -> Result<Blockhash> {
        Ok(Blockhash {
            hash: "test-blockhash".into(),
            last_valid_block_height: 100,
        })
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<TxSignature> {
        self.submitted.lock().await.push(tx.tx.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(TxSignature::new(format!("sig-{n}")))
    }

    async fn confirm(&self, _sig: &TxSignature, _blockhash: &Blockhash) -> Result<()> {
        if self.fail_confirm.load(Ordering::SeqCst) {
            return Err(MarketError::Confirmation("custom program error 0x1".into()));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Registry
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct MockRegistry {
    pins: RwLock<Vec<PinnedItem>>,
    profiles: RwLock<HashMap<WalletAddress, UserProfile>>,
    pub fail_pins: AtomicBool,
    pub fail_profiles: AtomicBool,
    counter: AtomicU64,
}

impl MockRegistry {
    /// Pre-pin a catalogue record for `nft`, as if it had been uploaded by
    /// an earlier session.
    pub async fn seed(&self, nft: &TrackNft) {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.pins.write().await.push(PinnedItem {
            ipfs_hash: format!("QmSeed{n}"),
            name: nft.title.clone(),
            keyvalues: catalog_keyvalues(nft),
            date_pinned: Utc::now(),
        });
    }

    pub async fn pins(&self) -> Vec<PinnedItem> {
        self.pins.read().await.clone()
    }

    pub async fn profile_of(&self, addr: &str) -> Option<UserProfile> {
        self.profiles
            .read()
            .await
            .get(&WalletAddress::new(addr))
            .cloned()
    }
}

#[async_trait]
impl AssetRegistry for MockRegistry {
    async fn list_pins(&self) -> Result<Vec<PinnedItem>> {
        Ok(self.pins.read().await.clone())
    }

    async fn pin_json(
        &self,
        name: &str,
        keyvalues: BTreeMap<String, String>,
        _body: serde_json::Value,
    ) -> Result<String> {
        if self.fail_pins.load(Ordering::SeqCst) {
            return Err(MarketError::Registry("pinning service unavailable".into()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let hash = format!("QmPinned{n}");
        self.pins.write().await.push(PinnedItem {
            ipfs_hash: hash.clone(),
            name: name.into(),
            keyvalues,
            date_pinned: Utc::now(),
        });
        Ok(hash)
    }

    async fn fetch_profile(&self, wallet: &WalletAddress) -> Result<Option<UserProfile>> {
        if self.fail_profiles.load(Ordering::SeqCst) {
            return Err(MarketError::Registry("pinning service unavailable".into()));
        }
        Ok(self.profiles.read().await.get(wallet).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        if self.fail_profiles.load(Ordering::SeqCst) {
            return Err(MarketError::Registry("pinning service unavailable".into()));
        }
        self.profiles
            .write()
            .await
            .insert(profile.wallet_address.clone(), profile.clone());
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Journal
// ----------------------------------------------------------------------------

/// Journal double whose writes fail once a settlement is past validation,
/// simulating a store outage mid-settlement.
#[derive(Default)]
pub struct FlakyJournal {
    inner: InMemorySettlementJournal,
    pub fail_after_validation: AtomicBool,
}

#[async_trait]
impl SettlementJournal for FlakyJournal {
    async fn record(&self, job: PendingSettlement) -> Result<()> {
        if self.fail_after_validation.load(Ordering::SeqCst)
            && job.phase != SettlementPhase::Validated
        {
            return Err(MarketError::Bookkeeping("journal store unavailable".into()));
        }
        self.inner.record(job).await
    }

    async fn get(&self, mint: &MintId) -> Result<Option<PendingSettlement>> {
        self.inner.get(mint).await
    }

    async fn unresolved(&self) -> Result<Vec<PendingSettlement>> {
        self.inner.unresolved().await
    }

    async fn remove(&self, mint: &MintId) -> Result<()> {
        self.inner.remove(mint).await
    }
}

// ----------------------------------------------------------------------------
// Minter
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct MockMinter {
    pub fail: AtomicBool,
    pub return_address: Option<String>,
    pub calls: AtomicU64,
}

impl MockMinter {
    pub fn returning(address: &str) -> Self {
        Self {
            return_address: Some(address.into()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl AssetMinter for MockMinter {
    async fn create_asset(&self, _spec: MintSpec) -> Result<MintedAsset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(MarketError::MintingFailed("minting backend offline".into()));
        }
        Ok(MintedAsset {
            address: self.return_address.clone(),
        })
    }
}

// ----------------------------------------------------------------------------
// Harness
// ----------------------------------------------------------------------------

/// Isolated environment wiring the production orchestrators against the
/// doubles above.
pub struct Harness {
    pub ledger: Arc<MockLedger>,
    pub registry: Arc<MockRegistry>,
    pub minter: Arc<MockMinter>,
    pub cache: Arc<InMemoryCatalogCache>,
    pub history: Arc<InMemoryHistoryStore>,
    pub journal: Arc<InMemorySettlementJournal>,
    pub config: Arc<MarketConfig>,
}

impl Harness {
    pub fn new() -> Self {
        Lazy::force(&LOG_HANDLE);
        Self {
            ledger: Arc::new(MockLedger::default()),
            registry: Arc::new(MockRegistry::default()),
            minter: Arc::new(MockMinter::default()),
            cache: Arc::new(InMemoryCatalogCache::new()),
            history: Arc::new(InMemoryHistoryStore::new()),
            journal: Arc::new(InMemorySettlementJournal::new()),
            config: Arc::new(MarketConfig::default()),
        }
    }

    pub fn purchases(&self) -> PurchaseOrchestrator<MockLedger, MockRegistry, MockMinter> {
        self.purchases_with_journal(self.journal.clone() as Arc<dyn SettlementJournal>)
    }

    pub fn purchases_with_journal(
        &self,
        journal: Arc<dyn SettlementJournal>,
    ) -> PurchaseOrchestrator<MockLedger, MockRegistry, MockMinter> {
        PurchaseOrchestrator::new(
            self.ledger.clone(),
            self.registry.clone(),
            self.minter.clone(),
            self.cache.clone() as Arc<dyn CatalogCache>,
            self.history.clone() as Arc<dyn HistoryStore>,
            journal,
            Arc::new(LogProgress),
            self.config.clone(),
        )
    }

    pub fn mint_copies(&self) -> MintCopyOrchestrator<MockLedger, MockRegistry, MockMinter> {
        MintCopyOrchestrator::new(
            self.ledger.clone(),
            self.registry.clone(),
            self.minter.clone(),
            self.cache.clone() as Arc<dyn CatalogCache>,
            self.history.clone() as Arc<dyn HistoryStore>,
            Arc::new(LogProgress),
            self.config.clone(),
        )
    }
}

/// A listed track fixture.
pub fn track(mint: &str, owner: &str, creator: &str, price: Decimal) -> TrackNft {
    TrackNft {
        title: "Neon Skyline".into(),
        artist: "Voltage Parade".into(),
        cover_art: "https://gateway.pinata.cloud/ipfs/QmCoverFixture".into(),
        audio_url: "https://gateway.pinata.cloud/ipfs/QmAudioFixture".into(),
        price,
        for_sale: true,
        mint: MintId::new(mint),
        owner: WalletAddress::new(owner),
        creator: WalletAddress::new(creator),
        genre: Some("electronic".into()),
        description: None,
        created_at: None,
    }
}
