//! # Devnet Deployment
//!
//! One-call deployment of the whole contract suite with mock collateral and
//! mock price feeds, at the constants in `retriever_protocol::config`.
//!
//! | Asset | Decimals | Feed answer (8 dp) |
//! |-------|----------|--------------------|
//! | RTV   | 18       | 1.00 USD           |
//! | WETH  | 18       | 1200.00 USD        |
//! | USDT  | 6        | 1.00 USD           |
//! | MATIC | 18       | 0.80 USD           |
//!
//! Every contract and feed address is derived from a `devnet:` label, so two
//! deployments with the same deployer are indistinguishable.

use std::collections::BTreeMap;
use std::sync::Arc;

use retriever_protocol::config::{
    BASE_REFERENCE_SYMBOL, DECIMALS, DEVNET_MATIC_USD_ANSWER, DEVNET_RTV_USD_ANSWER,
    DEVNET_USDT_USD_ANSWER, DEVNET_WETH_USD_ANSWER, FEED_DECIMALS,
};
use retriever_protocol::{Address, Amount};

use crate::creator_market::CreatorMarket;
use crate::oracle::{MockAggregator, PriceOracleRegistry};
use crate::private_sale::{PrivateSale, PrivateSaleConfig, SaleError};
use crate::token::{Token, TokenConfig, TokenError};

/// Collateral mocks: symbol, name, decimals, feed answer.
const COLLATERAL: [(&str, &str, u8, i128); 3] = [
    ("WETH", "Wrapped Ether", DECIMALS, DEVNET_WETH_USD_ANSWER),
    ("USDT", "Tether USD", 6, DEVNET_USDT_USD_ANSWER),
    ("MATIC", "Polygon", DECIMALS, DEVNET_MATIC_USD_ANSWER),
];

/// A deployed devnet suite.
#[derive(Debug)]
pub struct Devnet {
    /// Minter of every token, sale admin, and market owner.
    pub deployer: Address,
    /// The capped base currency.
    pub rtv: Arc<Token>,
    /// Collateral mocks by symbol: WETH, USDT, MATIC.
    pub collateral: BTreeMap<String, Arc<Token>>,
    /// Mock feeds by symbol, RTV included.
    pub feeds: BTreeMap<String, Arc<MockAggregator>>,
    /// Registry holding every feed above.
    pub registry: Arc<PriceOracleRegistry>,
    /// The private sale, deployed but not funded.
    pub sale: PrivateSale,
    /// The creator market, owned by `deployer`.
    pub market: CreatorMarket,
}

impl Devnet {
    /// Deploys the suite with RTV capped at `max_supply`.
    ///
    /// The sale is deployed but neither funded nor started.
    ///
    /// # Errors
    ///
    /// Returns [`SaleError`] if feed registration or sale construction fails,
    /// which only happens if the constants above are inconsistent.
    pub fn deploy(deployer: Address, max_supply: Amount) -> Result<Self, SaleError> {
        let rtv = Arc::new(Token::retriever(Address::derive("devnet:rtv"), deployer, max_supply));
        let registry = Arc::new(PriceOracleRegistry::new());
        let mut feeds = BTreeMap::new();
        let mut collateral = BTreeMap::new();

        let rtv_feed = Self::make_feed(BASE_REFERENCE_SYMBOL, DEVNET_RTV_USD_ANSWER);
        registry.register_feed(BASE_REFERENCE_SYMBOL, rtv_feed.clone())?;
        feeds.insert(BASE_REFERENCE_SYMBOL.to_string(), rtv_feed);

        for (symbol, name, decimals, answer) in COLLATERAL {
            let token = Arc::new(Token::new(TokenConfig {
                address: Address::derive(&format!("devnet:token:{symbol}")),
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals,
                max_supply: None,
                minter: deployer,
            }));
            let feed = Self::make_feed(symbol, answer);
            registry.register_feed(symbol, feed.clone())?;
            feeds.insert(symbol.to_string(), feed);
            collateral.insert(symbol.to_string(), token);
        }

        let sale = PrivateSale::new(PrivateSaleConfig {
            address: Address::derive("devnet:private-sale"),
            admin: deployer,
            max_supply,
            base_token: rtv.clone(),
            base_reference_symbol: BASE_REFERENCE_SYMBOL.to_string(),
            registry: registry.clone(),
            collateral: collateral.values().cloned().collect(),
        })?;
        let market = CreatorMarket::new(Address::derive("devnet:creator-market"), deployer, rtv.clone());

        tracing::info!(
            rtv = %rtv.address(),
            sale = %sale.address(),
            market = %market.address(),
            collateral = collateral.len(),
            "devnet deployed"
        );
        Ok(Self {
            deployer,
            rtv,
            collateral,
            feeds,
            registry,
            sale,
            market,
        })
    }

    /// Mints the sale's full allocation to the sale's address.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::SupplyCapExceeded`] if RTV has already been
    /// minted past what the cap leaves for the allocation.
    pub fn fund_sale(&self) -> Result<(), TokenError> {
        self.rtv.mint(
            &self.deployer,
            &self.sale.address(),
            self.sale.tokens_allocated_for_sale(),
        )
    }

    /// The collateral ledger for `symbol`.
    pub fn collateral(&self, symbol: &str) -> Option<&Arc<Token>> {
        self.collateral.get(&symbol.to_uppercase())
    }

    /// The mock feed for `symbol`, RTV included.
    pub fn feed(&self, symbol: &str) -> Option<&Arc<MockAggregator>> {
        self.feeds.get(&symbol.to_uppercase())
    }

    fn make_feed(symbol: &str, answer: i128) -> Arc<MockAggregator> {
        Arc::new(MockAggregator::new(
            Address::derive(&format!("devnet:feed:{symbol}")),
            format!("{symbol} / USD"),
            FEED_DECIMALS,
            answer,
        ))
    }
}
