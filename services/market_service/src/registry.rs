//! Pinning-store port and catalogue ingestion.
//!
//! The registry is append-only: there is no update-in-place and no delete.
//! An ownership change is expressed by pinning a *new* catalogue record;
//! superseded records simply stop being the latest and are shadowed at read
//! time. Profiles are separate JSON pins keyed by wallet address and are
//! rewritten wholesale.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use solmusic_common::{MintId, Result, TrackNft, UserProfile, WalletAddress};

#[cfg(feature = "http")]
pub mod pinata;

/// Public gateway prefix used when a pin carries no explicit URL.
pub const GATEWAY_BASE: &str = "https://gateway.pinata.cloud/ipfs/";

/// Name prefix distinguishing profile pins from catalogue records.
pub const PROFILE_PREFIX: &str = "solmusic_profile_";

/// Fallback media for records that arrived with only one of their two files.
pub const DEFAULT_AUDIO_URL: &str =
    "https://assets.mixkit.co/music/preview/mixkit-tech-house-vibes-130.mp3";
pub const DEFAULT_COVER_ART: &str = "https://placehold.co/600x600/3949ab/ffffff?text=Music+NFT";

/// One pinned object as listed by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinnedItem {
    pub ipfs_hash: String,
    pub name: String,
    /// Free-form string metadata attached at pin time.
    pub keyvalues: BTreeMap<String, String>,
    pub date_pinned: DateTime<Utc>,
}

impl PinnedItem {
    fn keyvalue(&self, key: &str) -> Option<&str> {
        self.keyvalues.get(key).map(String::as_str)
    }
}

/// Pinning-store port. Write operations only ever add pins.
#[async_trait]
pub trait AssetRegistry: Send + Sync {
    /// Every currently pinned object, catalogue records and profiles alike.
    async fn list_pins(&self) -> Result<Vec<PinnedItem>>;

    /// Pin a JSON body under `name` with the given key-values; returns the
    /// new pin's content hash.
    async fn pin_json(
        &self,
        name: &str,
        keyvalues: BTreeMap<String, String>,
        body: serde_json::Value,
    ) -> Result<String>;

    /// The most recently pinned profile for this wallet, if any.
    async fn fetch_profile(&self, wallet: &WalletAddress) -> Result<Option<UserProfile>>;

    /// Pin a fresh full copy of the profile.
    async fn save_profile(&self, profile: &UserProfile) -> Result<()>;
}

/// Pin a catalogue record for `nft`, the registry-side half of an ownership
/// rewrite. The record body is the full asset JSON; the key-values carry the
/// queryable fields.
pub async fn pin_catalog_record<R: AssetRegistry + ?Sized>(
    registry: &R,
    nft: &TrackNft,
) -> Result<String> {
    let body = serde_json::to_value(nft)?;
    registry
        .pin_json(&nft.title, catalog_keyvalues(nft), body)
        .await
}

/// Key-values for a catalogue record pin, named the way existing pins name
/// them so [`build_catalog`] can read its own output back.
pub fn catalog_keyvalues(nft: &TrackNft) -> BTreeMap<String, String> {
    let mut kv = BTreeMap::new();
    kv.insert("mint".into(), nft.mint.to_string());
    kv.insert("artist".into(), nft.artist.clone());
    kv.insert("owner".into(), nft.owner.to_string());
    kv.insert("creator".into(), nft.creator.to_string());
    kv.insert("price".into(), nft.price.to_string());
    kv.insert("forSale".into(), nft.for_sale.to_string());
    kv.insert("fileType".into(), "audio".into());
    kv.insert("audioUrl".into(), nft.audio_url.clone());
    kv.insert("coverArt".into(), nft.cover_art.clone());
    if let Some(genre) = &nft.genre {
        kv.insert("genre".into(), genre.clone());
    }
    if let Some(desc) = &nft.description {
        if desc.len() < 100 {
            kv.insert("description".into(), desc.clone());
        }
    }
    kv
}

/// Build the asset catalogue from a raw pin listing.
///
/// Pins are grouped by their `mint` key-value; the audio row and the image
/// row of one asset merge into a single record. Pins without a mint key are
/// skipped, and a grouped record survives only if it ended up with at least
/// one of cover art or audio.
pub fn build_catalog(pins: &[PinnedItem]) -> Vec<TrackNft> {
    let mut order: Vec<MintId> = Vec::new();
    let mut map: HashMap<MintId, TrackNft> = HashMap::new();

    for pin in pins {
        let Some(mint_raw) = pin.keyvalue("mint") else {
            continue;
        };
        let mint = MintId::new(mint_raw);
        let file_type = pin.keyvalue("fileType").unwrap_or("unknown");

        let nft = map.entry(mint.clone()).or_insert_with(|| {
            order.push(mint.clone());
            TrackNft {
                title: if pin.name.is_empty() {
                    "Untitled NFT".into()
                } else {
                    pin.name.clone()
                },
                artist: pin.keyvalue("artist").unwrap_or("Unknown Artist").into(),
                cover_art: String::new(),
                audio_url: String::new(),
                price: Decimal::new(5, 1),
                for_sale: pin.keyvalue("forSale") == Some("true"),
                mint: mint.clone(),
                owner: WalletAddress::new(pin.keyvalue("owner").unwrap_or(WalletAddress::UNKNOWN)),
                creator: WalletAddress::new(
                    pin.keyvalue("creator").unwrap_or(WalletAddress::UNKNOWN),
                ),
                genre: Some(pin.keyvalue("genre").unwrap_or("other").into()),
                description: pin.keyvalue("description").map(Into::into),
                created_at: None,
            }
        });

        if let Some(price) = pin.keyvalue("price").and_then(|p| Decimal::from_str(p).ok()) {
            nft.price = price;
        }

        let gateway_url = format!("{GATEWAY_BASE}{}", pin.ipfs_hash);
        match file_type {
            "audio" => {
                nft.audio_url = pin.keyvalue("audioUrl").map(Into::into).unwrap_or(gateway_url)
            }
            "image" => {
                nft.cover_art = pin.keyvalue("coverArt").map(Into::into).unwrap_or(gateway_url)
            }
            _ => {
                // Untyped pin: fill whichever slot is still empty.
                if nft.cover_art.is_empty() {
                    nft.cover_art = gateway_url;
                } else if nft.audio_url.is_empty() {
                    nft.audio_url = gateway_url;
                }
            }
        }
    }

    let catalog: Vec<TrackNft> = order
        .into_iter()
        .filter_map(|mint| map.remove(&mint))
        .filter(|nft| !nft.cover_art.is_empty() || !nft.audio_url.is_empty())
        .map(|mut nft| {
            if nft.audio_url.is_empty() {
                nft.audio_url = DEFAULT_AUDIO_URL.into();
            }
            if nft.cover_art.is_empty() {
                nft.cover_art = DEFAULT_COVER_ART.into();
            }
            nft
        })
        .collect();

    debug!(pins = pins.len(), assets = catalog.len(), "catalogue built");
    catalog
}
