//! On-chain asset creation port.

use async_trait::async_trait;

use solmusic_common::{Result, TrackNft, WalletAddress};

/// Inputs for creating one on-chain asset.
#[derive(Clone, Debug, PartialEq)]
pub struct MintSpec {
    pub name: String,
    /// Ticker-style tag: the first four characters of the artist name,
    /// uppercased.
    pub symbol: String,
    /// Metadata URI, typically the record's cover art.
    pub uri: String,
    pub seller_fee_bps: u16,
    /// Wallet that ends up owning the minted asset.
    pub owner: WalletAddress,
}

impl MintSpec {
    pub fn for_track(nft: &TrackNft, owner: WalletAddress, seller_fee_bps: u16) -> Self {
        let symbol: String = nft.artist.chars().take(4).collect::<String>().to_uppercase();
        Self {
            name: nft.title.clone(),
            symbol,
            uri: nft.cover_art.clone(),
            seller_fee_bps,
            owner,
        }
    }
}

/// What the minting backend reports back. Some backends only confirm the
/// mint without returning the new address; callers fabricate a local
/// identifier in that case.
#[derive(Clone, Debug, PartialEq)]
pub struct MintedAsset {
    pub address: Option<String>,
}

/// Creates assets on chain. A failure surfaces as
/// [`solmusic_common::MarketError::MintingFailed`].
#[async_trait]
pub trait AssetMinter: Send + Sync {
    async fn create_asset(&self, spec: MintSpec) -> Result<MintedAsset>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use solmusic_common::MintId;

    #[test]
    fn symbol_is_artist_prefix_uppercased() {
        let nft = TrackNft {
            title: "Aurora".into(),
            artist: "borealis beats".into(),
            cover_art: "https://gateway.pinata.cloud/ipfs/QmCover".into(),
            audio_url: String::new(),
            price: dec!(0.5),
            for_sale: true,
            mint: MintId::new("m1"),
            owner: WalletAddress::unknown(),
            creator: WalletAddress::unknown(),
            genre: None,
            description: None,
            created_at: None,
        };
        let spec = MintSpec::for_track(&nft, WalletAddress::unknown(), 500);
        assert_eq!(spec.symbol, "BORE");
        assert_eq!(spec.seller_fee_bps, 500);
        assert_eq!(spec.uri, nft.cover_art);
    }

    #[test]
    fn short_artist_names_keep_what_they_have() {
        let nft = TrackNft {
            title: "Dot".into(),
            artist: "io".into(),
            cover_art: String::new(),
            audio_url: String::new(),
            price: dec!(0.5),
            for_sale: false,
            mint: MintId::new("m2"),
            owner: WalletAddress::unknown(),
            creator: WalletAddress::unknown(),
            genre: None,
            description: None,
            created_at: None,
        };
        assert_eq!(MintSpec::for_track(&nft, WalletAddress::unknown(), 500).symbol, "IO");
    }
}
