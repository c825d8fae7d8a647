//! Fee arithmetic and payee resolution.
//!
//! All splits are computed in integer lamports. The SOL price is floored
//! into lamports exactly once, then divided; the counter-party leg is the
//! remainder, so the two legs always sum to the floored total and rounding
//! never loses more than the sub-lamport fraction of the price itself.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use solmusic_common::{Lamports, MarketError, Result, WalletAddress, LAMPORTS_PER_SOL};

/// Payee legs of one payment, in lamports.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FeeSplit {
    /// Seller (purchase) or creator (mint copy). Zero when the recorded
    /// party is the `"unknown"` sentinel, in which case the leg is omitted.
    pub counterparty: Lamports,
    pub platform: Lamports,
}

impl FeeSplit {
    pub fn total(&self) -> Lamports {
        self.counterparty.saturating_add(self.platform)
    }
}

/// Floor a SOL amount into lamports. Negative amounts clamp to zero;
/// amounts past the ledger's representable range saturate, so an absurd
/// catalogue price reads as unaffordable instead of panicking.
pub fn sol_to_lamports(sol: Decimal) -> Lamports {
    if sol.is_sign_negative() {
        return 0;
    }
    sol.checked_mul(Decimal::from(LAMPORTS_PER_SOL))
        .and_then(|scaled| scaled.floor().to_u64())
        .unwrap_or(Lamports::MAX)
}

/// Split a purchase price between seller and platform.
///
/// An unknown owner routes the entire amount to the platform; otherwise the
/// platform takes `fee_percent` (floored) and the seller the remainder.
pub fn purchase_split(price: Decimal, owner_unknown: bool, fee_percent: u8) -> FeeSplit {
    let total = sol_to_lamports(price);
    if owner_unknown {
        return FeeSplit {
            counterparty: 0,
            platform: total,
        };
    }
    let platform = (u128::from(total) * u128::from(fee_percent) / 100) as Lamports;
    FeeSplit {
        counterparty: total - platform,
        platform,
    }
}

/// Split the flat mint-copy fee 80/20 between creator and platform, or
/// route all of it to the platform when the creator is unknown.
pub fn mint_copy_split(mint_fee: Decimal, creator_unknown: bool) -> FeeSplit {
    let total = sol_to_lamports(mint_fee);
    if creator_unknown {
        return FeeSplit {
            counterparty: 0,
            platform: total,
        };
    }
    let counterparty = (u128::from(total) * 80 / 100) as Lamports;
    FeeSplit {
        counterparty,
        platform: total - counterparty,
    }
}

/// Reject a recorded party address that is neither the sentinel nor a
/// well-formed on-ledger address.
pub fn validate_party(field: &str, addr: &WalletAddress) -> Result<()> {
    if addr.is_valid() {
        Ok(())
    } else {
        Err(MarketError::AddressInvalid {
            field: field.into(),
            value: addr.as_str().into(),
        })
    }
}

/// The effective payee: the recorded address, or the configured placeholder
/// when the record carries the sentinel. Funds are never sent to `"unknown"`.
pub fn resolve_payee(addr: &WalletAddress, placeholder: &WalletAddress) -> WalletAddress {
    if addr.is_unknown() {
        placeholder.clone()
    } else {
        addr.clone()
    }
}
