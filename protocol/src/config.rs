//! # Protocol Configuration & Constants
//!
//! Every magic number in Retriever lives here: token metadata, decimal
//! precisions, the supply cap, the private-sale allocation and the devnet
//! oracle answers. If a constant shows up anywhere else, move it here.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full version string of the engine.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Precision
// ---------------------------------------------------------------------------

/// Fractional digits of every ledger amount (base currency, creator tokens,
/// normalized prices).
pub const DECIMALS: u8 = 18;

/// Fractional digits of oracle answers. Chainlink-style USD feeds report
/// with 8 decimals by convention.
pub const FEED_DECIMALS: u8 = 8;

// ---------------------------------------------------------------------------
// Base Currency
// ---------------------------------------------------------------------------

/// Display name of the base currency.
pub const BASE_TOKEN_NAME: &str = "RETRIEVER";

/// Ticker of the base currency.
pub const BASE_TOKEN_SYMBOL: &str = "RTV";

/// Default supply cap, in whole tokens. One billion RTV.
pub const DEFAULT_MAX_SUPPLY_WHOLE: u64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// Private Sale
// ---------------------------------------------------------------------------

/// Basis-point denominator (100% = 10,000 bps).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Share of the max supply reserved for the private sale: 10%.
pub const PRIVATE_SALE_ALLOCATION_BPS: u64 = 1_000;

/// Symbol whose oracle price is the denominator of every sale conversion.
pub const BASE_REFERENCE_SYMBOL: &str = BASE_TOKEN_SYMBOL;

// ---------------------------------------------------------------------------
// Devnet Oracle Answers
// ---------------------------------------------------------------------------
//
// Initial answers for the mock aggregators deployed on devnet, in
// `FEED_DECIMALS` precision.

/// WETH / USD = 1200.00
pub const DEVNET_WETH_USD_ANSWER: i128 = 120_000_000_000;

/// USDT / USD = 1.00
pub const DEVNET_USDT_USD_ANSWER: i128 = 100_000_000;

/// MATIC / USD = 0.80
pub const DEVNET_MATIC_USD_ANSWER: i128 = 80_000_000;

/// RTV / USD = 1.00 (the sale's listing price)
pub const DEVNET_RTV_USD_ANSWER: i128 = 100_000_000;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A serializable view of the constants above, for tooling that wants to
/// print or diff them.
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolParameters {
    pub version: &'static str,
    pub decimals: u8,
    pub feed_decimals: u8,
    pub base_token_name: &'static str,
    pub base_token_symbol: &'static str,
    pub default_max_supply_whole: u64,
    pub private_sale_allocation_bps: u64,
    pub base_reference_symbol: &'static str,
}

impl ProtocolParameters {
    /// The parameters compiled into this build.
    pub fn current() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            decimals: DECIMALS,
            feed_decimals: FEED_DECIMALS,
            base_token_name: BASE_TOKEN_NAME,
            base_token_symbol: BASE_TOKEN_SYMBOL,
            default_max_supply_whole: DEFAULT_MAX_SUPPLY_WHOLE,
            private_sale_allocation_bps: PRIVATE_SALE_ALLOCATION_BPS,
            base_reference_symbol: BASE_REFERENCE_SYMBOL,
        }
    }
}
