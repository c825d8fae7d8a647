//! Typed local repository for the asset catalogue.
//!
//! An explicit `get / replace / invalidate / compare_and_put` interface
//! carrying a monotonic revision per asset, so concurrent writes can be
//! detected instead of silently accepted. A session-scoped "pending update"
//! overlay bridges the staleness window between a mutation and the next
//! full refetch from the remote registry.
//!
//! Note the cache has no TTL: it lives until the next mutating action
//! invalidates it.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use solmusic_common::{MarketError, MintId, Result, TrackNft};

/// A catalogue entry together with its local revision counter.
#[derive(Clone, Debug)]
pub struct VersionedNft {
    pub revision: u64,
    pub nft: TrackNft,
}

/// Read/write port for the locally cached catalogue.
#[async_trait]
pub trait CatalogCache: Send + Sync + 'static {
    /// The merged catalogue view, or `None` when the cache is cold and a
    /// remote refetch is required. Pending updates are overlaid on top.
    async fn get_all(&self) -> Option<Vec<TrackNft>>;

    /// Single-asset lookup through the same merged view.
    async fn get(&self, mint: &MintId) -> Option<TrackNft>;

    /// Replace the whole catalogue from a fresh remote fetch. Revisions of
    /// surviving entries are bumped, new entries start at revision 1.
    async fn replace_all(&self, assets: Vec<TrackNft>);

    /// Drop the cached catalogue. Pending updates survive so the next read
    /// after a mutation still reflects it.
    async fn invalidate(&self);

    /// Insert or update a single asset, guarded by the caller's expected
    /// revision (`None` = must not exist yet). Returns the new revision or
    /// [`MarketError::Conflict`] on a mismatch.
    async fn compare_and_put(
        &self,
        expected_revision: Option<u64>,
        nft: TrackNft,
    ) -> Result<u64>;

    /// Current revision of an asset, if cached.
    async fn revision_of(&self, mint: &MintId) -> Option<u64>;

    /// Stage a session-scoped replacement: reads will show `nft` instead of
    /// the record identified by `replaces` until the overlay is cleared.
    async fn stage_pending(&self, replaces: MintId, nft: TrackNft);

    /// Drop the pending overlay (after a refetch confirmed the mutation).
    async fn clear_pending(&self);
}

#[derive(Default)]
struct CatalogInner {
    entries: HashMap<MintId, VersionedNft>,
    populated: bool,
    /// `(superseded mint, replacement record)` pairs, session-scoped.
    pending: Vec<(MintId, TrackNft)>,
}

impl CatalogInner {
    fn merged_view(&self) -> Vec<TrackNft> {
        // Hide records superseded within this session, and dedupe entries a
        // later refetch already picked up from the remote side.
        let shadowed = |mint: &MintId| {
            self.pending
                .iter()
                .any(|(old, new)| old == mint || &new.mint == mint)
        };
        let mut out: Vec<TrackNft> = self
            .entries
            .values()
            .filter(|v| !shadowed(&v.nft.mint))
            .map(|v| v.nft.clone())
            .collect();
        out.extend(self.pending.iter().map(|(_, nft)| nft.clone()));
        out
    }
}

/// Thread-safe in-memory implementation. Swap for a persistent backend if
/// the host needs the catalogue to outlive the process.
#[derive(Default)]
pub struct InMemoryCatalogCache {
    inner: RwLock<CatalogInner>,
}

impl InMemoryCatalogCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogCache for InMemoryCatalogCache {
    async fn get_all(&self) -> Option<Vec<TrackNft>> {
        let inner = self.inner.read().await;
        if !inner.populated {
            return None;
        }
        Some(inner.merged_view())
    }

    async fn get(&self, mint: &MintId) -> Option<TrackNft> {
        let inner = self.inner.read().await;
        if let Some((_, nft)) = inner.pending.iter().find(|(_, n)| &n.mint == mint) {
            return Some(nft.clone());
        }
        if inner.pending.iter().any(|(old, _)| old == mint) {
            // Superseded within this session; treat the stale record as gone.
            return None;
        }
        inner.entries.get(mint).map(|v| v.nft.clone())
    }

    async fn replace_all(&self, assets: Vec<TrackNft>) {
        let mut inner = self.inner.write().await;
        let mut fresh = HashMap::with_capacity(assets.len());
        for nft in assets {
            let revision = inner
                .entries
                .get(&nft.mint)
                .map(|v| v.revision + 1)
                .unwrap_or(1);
            fresh.insert(nft.mint.clone(), VersionedNft { revision, nft });
        }
        debug!(count = fresh.len(), "catalogue cache replaced");
        inner.entries = fresh;
        inner.populated = true;
    }

    async fn invalidate(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.populated = false;
        debug!("catalogue cache invalidated");
    }

    async fn compare_and_put(
        &self,
        expected_revision: Option<u64>,
        nft: TrackNft,
    ) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let current = inner.entries.get(&nft.mint).map(|v| v.revision);
        if current != expected_revision {
            return Err(MarketError::Conflict(format!(
                "revision mismatch for {}: expected {:?}, found {:?}",
                nft.mint, expected_revision, current
            )));
        }
        let revision = current.map(|r| r + 1).unwrap_or(1);
        inner
            .entries
            .insert(nft.mint.clone(), VersionedNft { revision, nft });
        Ok(revision)
    }

    async fn revision_of(&self, mint: &MintId) -> Option<u64> {
        self.inner.read().await.entries.get(mint).map(|v| v.revision)
    }

    async fn stage_pending(&self, replaces: MintId, nft: TrackNft) {
        let mut inner = self.inner.write().await;
        inner.pending.push((replaces, nft));
    }

    async fn clear_pending(&self) {
        self.inner.write().await.pending.clear();
    }
}
