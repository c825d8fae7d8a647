//! Integration tests for the mint-copy workflow.

mod support;

use std::sync::atomic::Ordering;

use rust_decimal_macros::dec;

use solmusic_common::{MarketError, TxKind, WalletAddress, LAMPORTS_PER_SOL};
use solmusic_store::{CatalogCache, HistoryStore};

use support::{track, Harness, MockWallet, BUYER, CREATOR, SELLER};

const ON_CHAIN_ADDRESS: &str = "3mQa8uFreshMintFreshMintFreshMintFresh05";

#[tokio::test]
async fn known_creator_split_is_80_20() {
    let h = Harness::new();
    h.ledger.set_balance(BUYER, LAMPORTS_PER_SOL).await;

    let nft = track("mint-1", SELLER, CREATOR, dec!(3.0));
    let receipt = h
        .mint_copies()
        .mint_copy(&MockWallet::new(BUYER), &nft)
        .await
        .unwrap();

    let submissions = h.ledger.submissions().await;
    assert_eq!(submissions.len(), 1);
    let tx = &submissions[0];
    // The flat fee, not the listing price, is what gets split.
    assert_eq!(tx.legs.len(), 2);
    assert_eq!(tx.legs[0].to, WalletAddress::new(CREATOR));
    assert_eq!(tx.legs[0].lamports, 8_000_000);
    assert_eq!(tx.legs[1].to, h.config.platform.address);
    assert_eq!(tx.legs[1].lamports, 2_000_000);
    assert!(receipt.warnings.is_empty());
}

#[tokio::test]
async fn unknown_creator_routes_full_fee_to_platform() {
    let h = Harness::new();
    h.ledger.set_balance(BUYER, LAMPORTS_PER_SOL).await;

    let nft = track("mint-2", SELLER, "unknown", dec!(3.0));
    h.mint_copies()
        .mint_copy(&MockWallet::new(BUYER), &nft)
        .await
        .unwrap();

    let submissions = h.ledger.submissions().await;
    assert_eq!(submissions[0].legs.len(), 1);
    assert_eq!(submissions[0].legs[0].to, h.config.platform.address);
    assert_eq!(submissions[0].legs[0].lamports, 10_000_000);
}

#[tokio::test]
async fn insufficient_balance_rejects_before_submission() {
    let h = Harness::new();
    // Covers the fee but not the mint gas buffer.
    h.ledger.set_balance(BUYER, 10_000_000).await;

    let nft = track("mint-3", SELLER, CREATOR, dec!(3.0));
    let err = h
        .mint_copies()
        .mint_copy(&MockWallet::new(BUYER), &nft)
        .await
        .unwrap_err();

    match err {
        MarketError::InsufficientFunds { required, .. } => {
            assert_eq!(required, 10_000_000 + 50_000_000);
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }
    assert!(h.ledger.submissions().await.is_empty());
}

#[tokio::test]
async fn minting_failure_after_payment_is_its_own_error() {
    let h = Harness::new();
    h.ledger.set_balance(BUYER, LAMPORTS_PER_SOL).await;
    h.minter.fail.store(true, Ordering::SeqCst);

    let nft = track("mint-4", SELLER, CREATOR, dec!(3.0));
    let err = h
        .mint_copies()
        .mint_copy(&MockWallet::new(BUYER), &nft)
        .await
        .unwrap_err();

    // The fee was paid and there is no refund path; the error kind says so.
    assert!(matches!(err, MarketError::MintingFailed(_)));
    assert!(!err.is_safe_to_retry());
    assert_eq!(h.ledger.submissions().await.len(), 1);
    assert!(h.history.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn on_chain_address_becomes_the_copy_identity() {
    let h = Harness::new();
    h.ledger.set_balance(BUYER, LAMPORTS_PER_SOL).await;
    let h = Harness {
        minter: std::sync::Arc::new(support::MockMinter::returning(ON_CHAIN_ADDRESS)),
        ..h
    };

    let nft = track("mint-5", SELLER, CREATOR, dec!(3.0));
    let receipt = h
        .mint_copies()
        .mint_copy(&MockWallet::new(BUYER), &nft)
        .await
        .unwrap();
    assert_eq!(receipt.mint.as_str(), ON_CHAIN_ADDRESS);
}

#[tokio::test]
async fn success_records_history_and_invalidates_cache() {
    let h = Harness::new();
    h.ledger.set_balance(BUYER, LAMPORTS_PER_SOL).await;
    h.cache.replace_all(Vec::new()).await;

    let nft = track("mint-6", SELLER, CREATOR, dec!(3.0));
    let receipt = h
        .mint_copies()
        .mint_copy(&MockWallet::new(BUYER), &nft)
        .await
        .unwrap();

    // No on-chain address from the backend, so the identity is fabricated.
    assert!(receipt.mint.as_str().starts_with("copy-"));
    assert!(receipt.mint.as_str().ends_with("-mint-6"));

    let all = h.history.all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].kind, TxKind::Mint);
    assert_eq!(all[0].price, dec!(0.01));
    assert_eq!(all[0].other_party, WalletAddress::new(CREATOR));
    assert_eq!(all[0].nft.owner, WalletAddress::new(BUYER));

    // The stale catalogue was dropped.
    assert!(h.cache.get_all().await.is_none());

    // The minter's profile lists the copy.
    let profile = h.registry.profile_of(BUYER).await.unwrap();
    assert!(profile.owned_mints.contains(&receipt.mint));
}
