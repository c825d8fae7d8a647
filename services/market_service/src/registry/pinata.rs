//! Hosted Pinata backend for [`AssetRegistry`].
//!
//! Compiled only with the `http` feature; everything else in the crate is
//! transport-agnostic and tests run against in-memory doubles.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{instrument, warn};

use solmusic_common::{MarketError, Result, UserProfile, WalletAddress};

use super::{AssetRegistry, PinnedItem, GATEWAY_BASE, PROFILE_PREFIX};

const API_BASE: &str = "https://api.pinata.cloud";

pub struct PinataRegistry {
    http: reqwest::Client,
    jwt: String,
}

impl PinataRegistry {
    pub fn new(jwt: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            jwt: jwt.into(),
        }
    }

    async fn fetch_json(&self, ipfs_hash: &str) -> Result<serde_json::Value> {
        let url = format!("{GATEWAY_BASE}{ipfs_hash}");
        let body = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketError::Registry(e.to_string()))?
            .error_for_status()
            .map_err(|e| MarketError::Registry(e.to_string()))?
            .json()
            .await
            .map_err(|e| MarketError::Registry(e.to_string()))?;
        Ok(body)
    }
}

#[derive(Deserialize)]
struct PinListResponse {
    rows: Vec<PinRow>,
}

#[derive(Deserialize)]
struct PinRow {
    ipfs_pin_hash: String,
    date_pinned: DateTime<Utc>,
    metadata: Option<PinRowMetadata>,
}

#[derive(Deserialize)]
struct PinRowMetadata {
    name: Option<String>,
    keyvalues: Option<BTreeMap<String, serde_json::Value>>,
}

impl From<PinRow> for PinnedItem {
    fn from(row: PinRow) -> Self {
        let (name, keyvalues) = match row.metadata {
            Some(meta) => (
                meta.name.unwrap_or_default(),
                meta.keyvalues
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(k, v)| {
                        // Pinata stores key-values loosely typed; normalise
                        // everything to strings the way the reader expects.
                        let s = match v {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (k, s)
                    })
                    .collect(),
            ),
            None => (String::new(), BTreeMap::new()),
        };
        PinnedItem {
            ipfs_hash: row.ipfs_pin_hash,
            name,
            keyvalues,
            date_pinned: row.date_pinned,
        }
    }
}

#[derive(Deserialize)]
struct PinJsonResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

#[async_trait]
impl AssetRegistry for PinataRegistry {
    #[instrument(skip(self))]
    async fn list_pins(&self) -> Result<Vec<PinnedItem>> {
        let resp: PinListResponse = self
            .http
            .get(format!("{API_BASE}/data/pinList?status=pinned"))
            .bearer_auth(&self.jwt)
            .send()
            .await
            .map_err(|e| MarketError::Registry(e.to_string()))?
            .error_for_status()
            .map_err(|e| MarketError::Registry(e.to_string()))?
            .json()
            .await
            .map_err(|e| MarketError::Registry(e.to_string()))?;
        Ok(resp.rows.into_iter().map(PinnedItem::from).collect())
    }

    #[instrument(skip(self, keyvalues, body))]
    async fn pin_json(
        &self,
        name: &str,
        keyvalues: BTreeMap<String, String>,
        body: serde_json::Value,
    ) -> Result<String> {
        let payload = json!({
            "pinataMetadata": { "name": name, "keyvalues": keyvalues },
            "pinataContent": body,
        });
        let resp: PinJsonResponse = self
            .http
            .post(format!("{API_BASE}/pinning/pinJSONToIPFS"))
            .bearer_auth(&self.jwt)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MarketError::Registry(e.to_string()))?
            .error_for_status()
            .map_err(|e| MarketError::Registry(e.to_string()))?
            .json()
            .await
            .map_err(|e| MarketError::Registry(e.to_string()))?;
        Ok(resp.ipfs_hash)
    }

    async fn fetch_profile(&self, wallet: &WalletAddress) -> Result<Option<UserProfile>> {
        let profile_name = format!("{PROFILE_PREFIX}{wallet}");
        let mut candidates: Vec<PinnedItem> = self
            .list_pins()
            .await?
            .into_iter()
            .filter(|pin| pin.name == profile_name)
            .collect();
        // Profiles are append-only pins; the newest one wins.
        candidates.sort_by_key(|pin| pin.date_pinned);
        let Some(latest) = candidates.pop() else {
            return Ok(None);
        };

        match serde_json::from_value(self.fetch_json(&latest.ipfs_hash).await?) {
            Ok(profile) => Ok(Some(profile)),
            Err(err) => {
                warn!(%wallet, %err, "unreadable profile pin, treating as absent");
                Ok(None)
            }
        }
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let name = format!("{PROFILE_PREFIX}{}", profile.wallet_address);
        let mut keyvalues = BTreeMap::new();
        keyvalues.insert("wallet".to_string(), profile.wallet_address.to_string());
        keyvalues.insert("kind".to_string(), "profile".to_string());
        self.pin_json(&name, keyvalues, serde_json::to_value(profile)?)
            .await?;
        Ok(())
    }
}
