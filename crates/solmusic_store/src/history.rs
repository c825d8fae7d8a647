//! Local transaction-history store.
//!
//! The history is a flat list of [`TransactionRecord`]s appended by whichever
//! session performed the transfer, including the counter-party's record,
//! which the initiating session fabricates. There is no server authority;
//! the file backend keeps the whole list as a single JSON blob under one
//! well-known file name.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use solmusic_common::{Result, TransactionRecord, TxKind, WalletAddress};

/// File name used by the persistent backend.
pub const HISTORY_FILE_NAME: &str = "nft_transactions.json";

/// Per-wallet view over the history.
#[derive(Clone, Debug, Default)]
pub struct WalletHistory {
    pub sold: Vec<TransactionRecord>,
    pub purchased: Vec<TransactionRecord>,
}

/// Append-only port for the local transaction history.
#[async_trait]
pub trait HistoryStore: Send + Sync + 'static {
    async fn append(&self, tx: TransactionRecord) -> Result<()>;

    async fn all(&self) -> Result<Vec<TransactionRecord>>;

    /// Replace the whole list (used by the remote profile merge).
    async fn replace_all(&self, txs: Vec<TransactionRecord>) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    /// Sold = `sell` records naming this wallet as counter-party's seller;
    /// purchased = `buy`/`mint` records whose snapshot owner is this wallet.
    async fn for_wallet(&self, wallet: &WalletAddress) -> Result<WalletHistory> {
        let all = self.all().await?;
        Ok(split_for_wallet(&all, wallet))
    }
}

/// Filter semantics shared by all backends.
pub fn split_for_wallet(txs: &[TransactionRecord], wallet: &WalletAddress) -> WalletHistory {
    let sold = txs
        .iter()
        .filter(|tx| tx.kind == TxKind::Sell && &tx.other_party == wallet)
        .cloned()
        .collect();
    let purchased = txs
        .iter()
        .filter(|tx| {
            matches!(tx.kind, TxKind::Buy | TxKind::Mint) && &tx.nft.owner == wallet
        })
        .cloned()
        .collect();
    WalletHistory { sold, purchased }
}

// ----------------------------------------------------------------------------
// In-memory backend
// ----------------------------------------------------------------------------

/// Session-only store for tests and hosts without a data directory.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    txs: RwLock<Vec<TransactionRecord>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, tx: TransactionRecord) -> Result<()> {
        self.txs.write().await.push(tx);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<TransactionRecord>> {
        Ok(self.txs.read().await.clone())
    }

    async fn replace_all(&self, txs: Vec<TransactionRecord>) -> Result<()> {
        *self.txs.write().await = txs;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.txs.write().await.clear();
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// JSON-file backend
// ----------------------------------------------------------------------------

/// Persists the history as one JSON array in `<data_dir>/nft_transactions.json`.
///
/// Reads tolerate a missing or corrupt file: an empty history is returned
/// and the problem logged.
pub struct JsonFileHistoryStore {
    path: PathBuf,
    /// Serialises writers; the file itself is rewritten wholesale.
    lock: RwLock<()>,
}

impl JsonFileHistoryStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(HISTORY_FILE_NAME),
            lock: RwLock::new(()),
        }
    }

    async fn load(&self) -> Vec<TransactionRecord> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(txs) => txs,
                Err(err) => {
                    warn!(path = %self.path.display(), %err, "corrupt history file, starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        }
    }

    async fn store(&self, txs: &[TransactionRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(txs)?;
        tokio::fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), count = txs.len(), "history written");
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistoryStore {
    async fn append(&self, tx: TransactionRecord) -> Result<()> {
        let _w = self.lock.write().await;
        let mut txs = self.load().await;
        txs.push(tx);
        self.store(&txs).await
    }

    async fn all(&self) -> Result<Vec<TransactionRecord>> {
        let _r = self.lock.read().await;
        Ok(self.load().await)
    }

    async fn replace_all(&self, txs: Vec<TransactionRecord>) -> Result<()> {
        let _w = self.lock.write().await;
        self.store(&txs).await
    }

    async fn clear(&self) -> Result<()> {
        let _w = self.lock.write().await;
        self.store(&[]).await
    }
}
