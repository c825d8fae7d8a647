//! SolMusic market service.
//!
//! The two customer-facing workflows of the market, purchase and
//! mint-copy, plus everything they lean on: fee arithmetic, collaborator
//! ports (wallet, ledger, pinning registry, minting backend), catalogue
//! ingestion, remote profile maintenance, progress reporting and
//! configuration.
//!
//! Transport concerns stay outside: the orchestrators are pure domain
//! components wired against traits, so a host can plug in a real wallet
//! adapter and RPC node while tests run entirely in memory.

pub mod config;
pub mod fees;
pub mod mint_copy;
pub mod minter;
pub mod profile;
pub mod progress;
pub mod purchase;
pub mod registry;
pub mod wallet;

pub use config::{ConfigHandle, MarketConfig};
pub use fees::FeeSplit;
pub use mint_copy::{MintCopyOrchestrator, MintCopyReceipt};
pub use minter::{AssetMinter, MintSpec, MintedAsset};
pub use profile::ProfileSync;
pub use progress::{LogProgress, ProgressSink, ProgressStep};
pub use purchase::{PurchaseOrchestrator, PurchaseReceipt};
pub use registry::{build_catalog, AssetRegistry, PinnedItem};
pub use wallet::{
    Blockhash, LedgerClient, PaymentTransaction, SignedTransaction, TransferLeg, TxSignature,
    WalletSigner,
};
