//! Local persistence for the SolMusic market client.
//!
//! Three stores, all client-resident with no server authority:
//! * [`catalog`]: the cached asset catalogue with per-asset revisions,
//! * [`history`]: the append-only transaction history,
//! * [`journal`]: the settlement state machine bridging payment and
//!   bookkeeping.

pub mod catalog;
pub mod history;
pub mod journal;

pub use catalog::{CatalogCache, InMemoryCatalogCache, VersionedNft};
pub use history::{
    split_for_wallet, HistoryStore, InMemoryHistoryStore, JsonFileHistoryStore, WalletHistory,
    HISTORY_FILE_NAME,
};
pub use journal::{
    InMemorySettlementJournal, PendingSettlement, SettlementJournal, SettlementPhase,
};
