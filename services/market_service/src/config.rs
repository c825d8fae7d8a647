//! Configuration management for the SolMusic market service.
//!
//! All runtime behaviour is tunable through a hierarchical, multi-source
//! configuration backed by the `config` crate.
//!
//! Priority (lowest → highest):
//! 1. Compile-time defaults (`impl Default`).
//! 2. An optional TOML/YAML/JSON file passed at start-up.
//! 3. Environment variables with `SOLMUSIC_` prefix.
//!
//!     SOLMUSIC__PLATFORM__FEE_PERCENT=20   # double underscore = path separator
//!
//! The final, frozen [`MarketConfig`] instance is published as a global
//! singleton through [`get()`]. Orchestrators nevertheless receive their
//! config as an explicit `Arc` so tests can construct one without touching
//! the singleton.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use config::{Config, Environment, File};
use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use solmusic_common::{Lamports, MarketError, Result, WalletAddress, LAMPORTS_PER_SOL};

/// The platform treasury, doubling as the stand-in recipient when a
/// catalogue record carries the `"unknown"` owner or creator sentinel.
pub const DEFAULT_PLATFORM_ADDRESS: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Global singleton holder.
static MARKET_CONFIG: OnceCell<Arc<MarketConfig>> = OnceCell::new();

/// Convenient alias returned by [`init`].
pub type ConfigHandle = Arc<MarketConfig>;

/// Initialise the configuration singleton.
///
/// `config_path` is an optional explicit path to a configuration file. If
/// `None`, the loader tries `market.{toml,yaml,json}` in the working
/// directory. Calling `init` twice is an error.
pub fn init(config_path: Option<impl AsRef<Path>>) -> Result<ConfigHandle> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path.as_ref()).required(true));
    } else {
        for ext in ["toml", "yaml", "json"] {
            let file_name = format!("market.{ext}");
            if Path::new(&file_name).exists() {
                builder = builder.add_source(File::with_name(&file_name).required(false));
                break;
            }
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("SOLMUSIC")
            .separator("__")
            .try_parsing(true),
    );

    let settings = builder
        .build()
        .map_err(|e| MarketError::InvalidConfig(e.to_string()))?;

    // Deserialization falls back on the Default impls for missing sections.
    let config: MarketConfig = settings
        .try_deserialize()
        .map_err(|e| MarketError::InvalidConfig(e.to_string()))?;

    config.validate()?;

    let arc = Arc::new(config);
    MARKET_CONFIG
        .set(arc.clone())
        .map_err(|_| MarketError::InvalidConfig("configuration already initialised".into()))?;

    Ok(arc)
}

/// Obtain the frozen [`MarketConfig`]. Panics if [`init`] was never called.
#[inline(always)]
pub fn get() -> &'static MarketConfig {
    MARKET_CONFIG
        .get()
        .expect("configuration accessed before initialisation")
}

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub platform: PlatformConfig,
    pub payment: PaymentConfig,
    pub storage: StorageConfig,
}

impl MarketConfig {
    /// Validate internal consistency and invariants.
    pub fn validate(&self) -> Result<()> {
        if self.platform.fee_percent > 100 {
            return Err(MarketError::InvalidConfig(
                "platform.fee_percent must be <= 100".into(),
            ));
        }
        if self.platform.royalty_bps > 10_000 {
            return Err(MarketError::InvalidConfig(
                "platform.royalty_bps must be <= 10000".into(),
            ));
        }
        if !self.platform.address.is_valid() || self.platform.address.is_unknown() {
            return Err(MarketError::InvalidConfig(format!(
                "platform.address is not a valid wallet address: {}",
                self.platform.address
            )));
        }
        if !self.platform.placeholder_address.is_valid()
            || self.platform.placeholder_address.is_unknown()
        {
            return Err(MarketError::InvalidConfig(format!(
                "platform.placeholder_address is not a valid wallet address: {}",
                self.platform.placeholder_address
            )));
        }
        if self.payment.mint_fee_sol <= Decimal::ZERO {
            return Err(MarketError::InvalidConfig(
                "payment.mint_fee_sol must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Fee routing and platform identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Treasury wallet receiving the platform cut of every payment.
    pub address: WalletAddress,
    /// Recipient substituted for the `"unknown"` owner/creator sentinel.
    pub placeholder_address: WalletAddress,
    /// Platform cut of a purchase, in whole percent.
    pub fee_percent: u8,
    /// Seller fee basis points stamped onto newly minted assets.
    pub royalty_bps: u16,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            address: WalletAddress::new(DEFAULT_PLATFORM_ADDRESS),
            placeholder_address: WalletAddress::new(DEFAULT_PLATFORM_ADDRESS),
            fee_percent: 20,
            royalty_bps: 500,
        }
    }
}

/// Amounts and buffers around the payment transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Flat fee for minting a copy, in SOL.
    pub mint_fee_sol: Decimal,
    /// Headroom required above the transfer amount, in lamports.
    pub transfer_gas_buffer: Lamports,
    /// Headroom required above the mint fee, in lamports. On-chain asset
    /// creation costs considerably more than a plain transfer.
    pub mint_gas_buffer: Lamports,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            // 0.01 SOL
            mint_fee_sol: Decimal::new(1, 2),
            transfer_gas_buffer: 5_000,
            mint_gas_buffer: LAMPORTS_PER_SOL / 20,
        }
    }
}

/// Where the persistent local stores keep their files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./solmusic-data"),
        }
    }
}
