//! # Price Oracle Registry
//!
//! Binds collateral symbols to external price feeds and normalizes their
//! answers into 18-decimal [`Amount`]s.
//!
//! A feed is anything implementing [`PriceFeed`]: a single "latest round"
//! read returning a signed integer at the feed's own precision (8 decimals
//! for USD pairs by convention). [`MockAggregator`] is the devnet
//! implementation, with an `update_answer` hook for tests.
//!
//! The registry does not cache. Every [`PriceOracleRegistry::price_of`]
//! call re-reads the feed, so freshness is entirely the feed's concern.
//! There is no staleness bound on `updated_at`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use retriever_protocol::config::DECIMALS;
use retriever_protocol::math::rescale;
use retriever_protocol::{Address, Amount, MathError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while registering or reading price feeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// A feed is already bound to this symbol.
    #[error("price feed already registered for {0}")]
    AlreadyRegistered(String),

    /// No feed is bound to this symbol.
    #[error("no price feed registered for {0}")]
    UnknownAsset(String),

    /// The feed reported zero or a negative price, or a price too small to
    /// survive rescaling to 18 decimals.
    #[error("invalid price from {symbol} feed: {answer}")]
    InvalidPrice {
        /// The asset whose feed misbehaved.
        symbol: String,
        /// The raw answer.
        answer: i128,
    },

    /// Rescaling the answer failed.
    #[error(transparent)]
    Math(#[from] MathError),
}

// ---------------------------------------------------------------------------
// PriceFeed
// ---------------------------------------------------------------------------

/// One round of feed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    /// Monotonic round counter.
    pub round_id: u64,
    /// Price at the feed's precision. Signed, as external feeds report it.
    pub answer: i128,
    /// When the answer was last written.
    pub updated_at: DateTime<Utc>,
}

/// An external, read-only price source.
pub trait PriceFeed: Send + Sync + fmt::Debug {
    /// The feed's address.
    fn address(&self) -> Address;

    /// Fractional digits in [`RoundData::answer`].
    fn decimals(&self) -> u8;

    /// Human-readable pair, e.g. `"WETH / USD"`.
    fn description(&self) -> &str;

    /// The most recent round.
    fn latest_round(&self) -> RoundData;

    /// Shorthand for `latest_round().answer`.
    fn latest_answer(&self) -> i128 {
        self.latest_round().answer
    }
}

/// A settable aggregator used on devnet and in tests.
#[derive(Debug)]
pub struct MockAggregator {
    address: Address,
    decimals: u8,
    description: String,
    round: RwLock<RoundData>,
}

impl MockAggregator {
    /// Creates a feed at round 1 with `initial_answer`.
    pub fn new(address: Address, description: impl Into<String>, decimals: u8, initial_answer: i128) -> Self {
        Self {
            address,
            decimals,
            description: description.into(),
            round: RwLock::new(RoundData {
                round_id: 1,
                answer: initial_answer,
                updated_at: Utc::now(),
            }),
        }
    }

    /// Publishes a new answer as the next round.
    pub fn update_answer(&self, answer: i128) {
        let mut round = self.round.write();
        round.round_id += 1;
        round.answer = answer;
        round.updated_at = Utc::now();
        tracing::debug!(feed = %self.description, round = round.round_id, answer, "feed updated");
    }
}

impl PriceFeed for MockAggregator {
    fn address(&self) -> Address {
        self.address
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn latest_round(&self) -> RoundData {
        *self.round.read()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable binding of an asset symbol to its feed.
#[derive(Debug, Clone)]
pub struct FeedRef {
    /// Upper-cased asset symbol.
    pub symbol: String,
    /// The feed's address.
    pub feed_address: Address,
    /// The feed's precision, captured at registration.
    pub decimals: u8,
    feed: Arc<dyn PriceFeed>,
}

/// Maps asset symbols to price feeds.
#[derive(Debug, Default)]
pub struct PriceOracleRegistry {
    feeds: RwLock<BTreeMap<String, FeedRef>>,
}

impl PriceOracleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `symbol` to `feed`. Symbols are case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::AlreadyRegistered`] if the symbol is taken.
    pub fn register_feed(&self, symbol: &str, feed: Arc<dyn PriceFeed>) -> Result<(), OracleError> {
        let symbol = symbol.to_uppercase();
        let mut feeds = self.feeds.write();
        if feeds.contains_key(&symbol) {
            return Err(OracleError::AlreadyRegistered(symbol));
        }
        tracing::info!(
            symbol = %symbol,
            feed = %feed.address(),
            decimals = feed.decimals(),
            "price feed registered"
        );
        feeds.insert(
            symbol.clone(),
            FeedRef {
                symbol,
                feed_address: feed.address(),
                decimals: feed.decimals(),
                feed,
            },
        );
        Ok(())
    }

    /// Reads the feed for `symbol` and returns its price at 18 decimals.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::UnknownAsset`] for an unbound symbol and
    /// [`OracleError::InvalidPrice`] for a non-positive answer or one that
    /// rounds to zero at 18 decimals.
    pub fn price_of(&self, symbol: &str) -> Result<Amount, OracleError> {
        let symbol = symbol.to_uppercase();
        let feed_ref = self
            .feeds
            .read()
            .get(&symbol)
            .cloned()
            .ok_or_else(|| OracleError::UnknownAsset(symbol.clone()))?;

        let answer = feed_ref.feed.latest_answer();
        if answer <= 0 {
            tracing::warn!(symbol = %symbol, answer, "feed reported non-positive price");
            return Err(OracleError::InvalidPrice { symbol, answer });
        }
        // answer > 0, so the cast is lossless.
        let raw = Amount::from_units(answer as u128);
        let price = rescale(raw, feed_ref.decimals, DECIMALS)?;
        if price.is_zero() {
            tracing::warn!(
                symbol = %symbol,
                answer,
                decimals = feed_ref.decimals,
                "feed price below ledger precision"
            );
            return Err(OracleError::InvalidPrice { symbol, answer });
        }
        Ok(price)
    }

    /// The feed address bound to `symbol`.
    pub fn feed_address(&self, symbol: &str) -> Option<Address> {
        self.feeds
            .read()
            .get(&symbol.to_uppercase())
            .map(|f| f.feed_address)
    }

    /// Returns `true` if `symbol` has a feed.
    pub fn contains(&self, symbol: &str) -> bool {
        self.feeds.read().contains_key(&symbol.to_uppercase())
    }

    /// Registered symbols, sorted.
    pub fn symbols(&self) -> Vec<String> {
        self.feeds.read().keys().cloned().collect()
    }
}
