//! # Private Sale Contract
//!
//! A whitelist-gated sale of pre-allocated RTV against several collateral
//! assets, priced through the oracle registry.
//!
//! The lifecycle is:
//!
//! 1. **Fund**: the RTV minter mints [`PrivateSale::tokens_allocated_for_sale`]
//!    to the sale's own address.
//! 2. **Whitelist**: the admin approves investors one by one.
//! 3. **Start**: the admin flips the sale to `Running`. This is one-way and
//!    requires a non-zero RTV balance.
//! 4. **Buy**: whitelisted investors approve the sale on a collateral
//!    ledger, then trade it for RTV at
//!    `collateral * price(collateral) / price(RTV)`, floored.
//!
//! There is no `Ended` state. Once the allocation runs out, any buy that
//! would overdraw it fails with [`SaleError::InsufficientAllocation`].
//!
//! ## Atomicity
//!
//! A purchase moves two assets: collateral into custody and RTV out to the
//! buyer. Both ledgers are locked together (ascending address order), both
//! legs are validated, and only then are both applied.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use retriever_protocol::config::{BPS_DENOMINATOR, DECIMALS, PRIVATE_SALE_ALLOCATION_BPS};
use retriever_protocol::math::{mul_div, rescale};
use retriever_protocol::{Address, Amount, MathError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::oracle::{OracleError, PriceOracleRegistry};
use crate::token::{Token, TokenError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during private-sale operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaleError {
    /// Only the sale admin may perform this action.
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// What the caller attempted.
        action: &'static str,
    },

    /// The sale has not been started.
    #[error("private sale is not running")]
    NotRunning,

    /// `start_sale` was called on a running sale.
    #[error("private sale is already running")]
    AlreadyRunning,

    /// The buyer is not on the whitelist.
    #[error("{0} is not whitelisted for the private sale")]
    NotWhitelisted(Address),

    /// The sale's RTV balance cannot cover the request.
    #[error("insufficient allocation: requested {requested}, available {available}")]
    InsufficientAllocation {
        /// RTV the operation needed.
        requested: Amount,
        /// RTV held by the sale.
        available: Amount,
    },

    /// The symbol is not an accepted collateral asset.
    #[error("unsupported collateral asset: {0}")]
    UnsupportedAsset(String),

    /// The sale was constructed with inconsistent parameters.
    #[error("invalid sale configuration: {0}")]
    InvalidConfig(String),

    /// The collateral amount, or the RTV it converts to, is zero.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Price lookup failed.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// A ledger operation failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Arithmetic failure.
    #[error(transparent)]
    Math(#[from] MathError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Sale lifecycle. `NotStarted → Running`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleStatus {
    /// Whitelisting is open; purchases are not.
    NotStarted,
    /// Purchases are open.
    Running,
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaleStatus::NotStarted => write!(f, "NotStarted"),
            SaleStatus::Running => write!(f, "Running"),
        }
    }
}

/// Construction parameters for a [`PrivateSale`].
#[derive(Debug, Clone)]
pub struct PrivateSaleConfig {
    /// The sale's own address; it holds the allocation and the collateral.
    pub address: Address,
    /// The identity allowed to whitelist, start, and withdraw.
    pub admin: Address,
    /// RTV max supply; the allocation is a fixed share of it.
    pub max_supply: Amount,
    /// The RTV ledger.
    pub base_token: Arc<Token>,
    /// Registry symbol quoting RTV itself.
    pub base_reference_symbol: String,
    /// Price feeds for the base reference and every collateral asset.
    pub registry: Arc<PriceOracleRegistry>,
    /// Accepted collateral ledgers, keyed by their symbol.
    pub collateral: Vec<Arc<Token>>,
}

/// Receipt of a completed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Random v4 UUID identifying this receipt.
    pub receipt_id: String,
    /// Whitelisted investor who paid the collateral.
    pub buyer: Address,
    /// Upper-cased collateral symbol.
    pub symbol: String,
    /// Collateral pulled into custody, in the collateral's own decimals.
    pub collateral_amount: Amount,
    /// RTV credited to the buyer.
    pub base_amount: Amount,
    /// Collateral price used, 18 decimals.
    pub collateral_price: Amount,
    /// RTV reference price used, 18 decimals.
    pub base_price: Amount,
    /// When the purchase settled.
    pub at: DateTime<Utc>,
}

/// Observable sale events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SaleEvent {
    /// An investor was added to the whitelist.
    Whitelisted {
        /// The newly admitted investor.
        investor: Address,
        /// When the admin whitelisted them.
        at: DateTime<Utc>,
    },
    /// The sale opened.
    Started {
        /// RTV held by the sale at opening.
        allocation: Amount,
        /// When the sale opened.
        at: DateTime<Utc>,
    },
    /// A purchase settled.
    Purchased(Purchase),
    /// The admin moved collateral out of custody.
    CollateralWithdrawn {
        /// Collateral symbol.
        symbol: String,
        /// Recipient of the collateral.
        to: Address,
        /// Amount withdrawn, in the collateral's own decimals.
        amount: Amount,
        /// When the withdrawal happened.
        at: DateTime<Utc>,
    },
}

#[derive(Debug)]
struct SaleState {
    status: SaleStatus,
    whitelist: HashSet<Address>,
    events: Vec<SaleEvent>,
}

// ---------------------------------------------------------------------------
// PrivateSale
// ---------------------------------------------------------------------------

/// The private-sale contract.
#[derive(Debug)]
pub struct PrivateSale {
    address: Address,
    admin: Address,
    tokens_for_sale: Amount,
    base_token: Arc<Token>,
    base_reference_symbol: String,
    registry: Arc<PriceOracleRegistry>,
    collateral: BTreeMap<String, Arc<Token>>,
    state: Mutex<SaleState>,
}

impl PrivateSale {
    /// Creates a sale in `NotStarted` state.
    ///
    /// # Errors
    ///
    /// Returns [`SaleError::InvalidConfig`] if a collateral asset or the
    /// base reference lacks a feed, if two collateral ledgers share a
    /// symbol, or if the base token is listed as collateral.
    pub fn new(config: PrivateSaleConfig) -> Result<Self, SaleError> {
        let base_reference_symbol = config.base_reference_symbol.to_uppercase();
        if !config.registry.contains(&base_reference_symbol) {
            return Err(SaleError::InvalidConfig(format!(
                "no price feed for base reference {base_reference_symbol}"
            )));
        }

        let mut collateral = BTreeMap::new();
        for token in config.collateral {
            let symbol = token.symbol().to_string();
            if token.address() == config.base_token.address() {
                return Err(SaleError::InvalidConfig(format!(
                    "base token {symbol} cannot be collateral"
                )));
            }
            if !config.registry.contains(&symbol) {
                return Err(SaleError::InvalidConfig(format!("no price feed for {symbol}")));
            }
            if collateral.insert(symbol.clone(), token).is_some() {
                return Err(SaleError::InvalidConfig(format!("duplicate collateral {symbol}")));
            }
        }

        let tokens_for_sale = mul_div(
            config.max_supply,
            Amount::from_units(u128::from(PRIVATE_SALE_ALLOCATION_BPS)),
            Amount::from_units(u128::from(BPS_DENOMINATOR)),
        )?;

        Ok(Self {
            address: config.address,
            admin: config.admin,
            tokens_for_sale,
            base_token: config.base_token,
            base_reference_symbol,
            registry: config.registry,
            collateral,
            state: Mutex::new(SaleState {
                status: SaleStatus::NotStarted,
                whitelist: HashSet::new(),
                events: Vec::new(),
            }),
        })
    }

    /// The sale's own address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The sale admin.
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// The RTV ledger address.
    pub fn base_token_address(&self) -> Address {
        self.base_token.address()
    }

    /// RTV the deployer is expected to fund the sale with.
    pub fn tokens_allocated_for_sale(&self) -> Amount {
        self.tokens_for_sale
    }

    /// `true` once the sale has started.
    pub fn private_sale_status(&self) -> bool {
        self.status() == SaleStatus::Running
    }

    /// Current lifecycle state.
    pub fn status(&self) -> SaleStatus {
        self.state.lock().status
    }

    /// Returns `true` if `investor` may buy.
    pub fn is_whitelisted(&self, investor: &Address) -> bool {
        self.state.lock().whitelist.contains(investor)
    }

    /// RTV still held by the sale.
    pub fn remaining_allocation(&self) -> Amount {
        self.base_token.balance_of(&self.address)
    }

    /// Accepted collateral symbols, sorted.
    pub fn accepted_assets(&self) -> Vec<String> {
        self.collateral.keys().cloned().collect()
    }

    /// Collateral of `symbol` held in custody.
    ///
    /// # Errors
    ///
    /// Returns [`SaleError::UnsupportedAsset`] for unknown symbols.
    pub fn collateral_balance(&self, symbol: &str) -> Result<Amount, SaleError> {
        Ok(self.collateral_token(symbol)?.balance_of(&self.address))
    }

    /// Adds `investor` to the whitelist. Repeat calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`SaleError::Unauthorized`] unless `caller` is the admin.
    pub fn whitelist(&self, caller: &Address, investor: &Address) -> Result<(), SaleError> {
        self.ensure_admin(caller, "whitelist")?;
        let mut state = self.state.lock();
        if state.whitelist.insert(*investor) {
            state.events.push(SaleEvent::Whitelisted {
                investor: *investor,
                at: Utc::now(),
            });
            tracing::info!(investor = %investor, "investor whitelisted");
        }
        Ok(())
    }

    /// Opens the sale.
    ///
    /// # Errors
    ///
    /// Returns [`SaleError::Unauthorized`] unless `caller` is the admin,
    /// [`SaleError::AlreadyRunning`] on a second call, and
    /// [`SaleError::InsufficientAllocation`] if the sale holds no RTV.
    pub fn start_sale(&self, caller: &Address) -> Result<(), SaleError> {
        self.ensure_admin(caller, "start the sale")?;
        let mut state = self.state.lock();
        if state.status == SaleStatus::Running {
            return Err(SaleError::AlreadyRunning);
        }
        let allocation = self.remaining_allocation();
        if allocation.is_zero() {
            return Err(SaleError::InsufficientAllocation {
                requested: self.tokens_for_sale,
                available: allocation,
            });
        }
        state.status = SaleStatus::Running;
        state.events.push(SaleEvent::Started {
            allocation,
            at: Utc::now(),
        });
        tracing::info!(allocation = %allocation.display_decimal(), "private sale started");
        Ok(())
    }

    /// Converts `collateral_amount` of `symbol` to RTV at current prices.
    ///
    /// # Errors
    ///
    /// Returns [`SaleError::UnsupportedAsset`] or any oracle error.
    pub fn quote(&self, symbol: &str, collateral_amount: Amount) -> Result<Amount, SaleError> {
        self.convert(symbol, collateral_amount).map(|(amount, _, _)| amount)
    }

    /// Buys RTV with `collateral_amount` of `symbol`.
    ///
    /// The caller must have approved the sale's address on the collateral
    /// ledger for at least `collateral_amount`.
    ///
    /// # Errors
    ///
    /// Returns [`SaleError::Unauthorized`] if `caller` is the sale itself,
    /// [`SaleError::NotRunning`], [`SaleError::NotWhitelisted`],
    /// [`SaleError::ZeroAmount`], [`SaleError::UnsupportedAsset`],
    /// [`SaleError::InsufficientAllocation`], or the collateral ledger's
    /// allowance/balance error. On any error nothing moves.
    pub fn buy(&self, caller: &Address, symbol: &str, collateral_amount: Amount) -> Result<Purchase, SaleError> {
        if *caller == self.address {
            tracing::warn!("rejected purchase by the sale's own address");
            return Err(SaleError::Unauthorized {
                caller: *caller,
                action: "buy from itself",
            });
        }
        let mut state = self.state.lock();
        if state.status != SaleStatus::Running {
            return Err(SaleError::NotRunning);
        }
        if !state.whitelist.contains(caller) {
            tracing::warn!(buyer = %caller, "purchase from non-whitelisted address");
            return Err(SaleError::NotWhitelisted(*caller));
        }
        if collateral_amount.is_zero() {
            return Err(SaleError::ZeroAmount);
        }

        let (base_amount, collateral_price, base_price) = self.convert(symbol, collateral_amount)?;
        if base_amount.is_zero() {
            return Err(SaleError::ZeroAmount);
        }

        let token = self.collateral_token(symbol)?;
        let (mut collateral_ledger, mut base_ledger) = Token::lock_pair(token, &self.base_token)?;

        let available = base_ledger.balance_of(&self.address);
        if base_amount > available {
            return Err(SaleError::InsufficientAllocation {
                requested: base_amount,
                available,
            });
        }
        collateral_ledger.check_transfer_from(&self.address, caller, &self.address, collateral_amount)?;
        base_ledger.check_transfer(&self.address, caller, base_amount)?;

        collateral_ledger.transfer_from(&self.address, caller, &self.address, collateral_amount)?;
        base_ledger.transfer(&self.address, caller, base_amount)?;

        let purchase = Purchase {
            receipt_id: Uuid::new_v4().to_string(),
            buyer: *caller,
            symbol: token.symbol().to_string(),
            collateral_amount,
            base_amount,
            collateral_price,
            base_price,
            at: Utc::now(),
        };
        state.events.push(SaleEvent::Purchased(purchase.clone()));
        tracing::info!(
            buyer = %caller,
            symbol = %purchase.symbol,
            collateral = %collateral_amount.display_decimal(),
            rtv = %base_amount.display_decimal(),
            "private sale purchase"
        );
        Ok(purchase)
    }

    /// Sends collected collateral out of custody. Admin only.
    ///
    /// # Errors
    ///
    /// Returns [`SaleError::Unauthorized`], [`SaleError::UnsupportedAsset`],
    /// or the ledger's balance error.
    pub fn withdraw_collateral(
        &self,
        caller: &Address,
        symbol: &str,
        to: &Address,
        amount: Amount,
    ) -> Result<(), SaleError> {
        self.ensure_admin(caller, "withdraw collateral")?;
        let token = self.collateral_token(symbol)?;
        // Held for the whole transfer so the event order matches the ledger's.
        let mut state = self.state.lock();
        token.transfer(&self.address, to, amount)?;
        state.events.push(SaleEvent::CollateralWithdrawn {
            symbol: token.symbol().to_string(),
            to: *to,
            amount,
            at: Utc::now(),
        });
        tracing::info!(symbol = %token.symbol(), to = %to, amount = %amount, "collateral withdrawn");
        Ok(())
    }

    /// Drains the event journal.
    pub fn take_events(&self) -> Vec<SaleEvent> {
        std::mem::take(&mut self.state.lock().events)
    }

    fn convert(&self, symbol: &str, collateral_amount: Amount) -> Result<(Amount, Amount, Amount), SaleError> {
        let token = self.collateral_token(symbol)?;
        let normalized = rescale(collateral_amount, token.decimals(), DECIMALS)?;
        let collateral_price = self.registry.price_of(token.symbol())?;
        let base_price = self.registry.price_of(&self.base_reference_symbol)?;
        let base_amount = mul_div(normalized, collateral_price, base_price)?;
        Ok((base_amount, collateral_price, base_price))
    }

    fn collateral_token(&self, symbol: &str) -> Result<&Arc<Token>, SaleError> {
        let symbol = symbol.to_uppercase();
        self.collateral
            .get(&symbol)
            .ok_or(SaleError::UnsupportedAsset(symbol))
    }

    fn ensure_admin(&self, caller: &Address, action: &'static str) -> Result<(), SaleError> {
        if *caller != self.admin {
            tracing::warn!(caller = %caller, action, "rejected privileged sale call");
            return Err(SaleError::Unauthorized {
                caller: *caller,
                action,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockAggregator;
    use crate::token::TokenConfig;
    use retriever_protocol::config::FEED_DECIMALS;

    struct Fixture {
        admin: Address,
        rtv: Arc<Token>,
        usdt: Arc<Token>,
        sale: PrivateSale,
    }

    fn fixture() -> Fixture {
        let admin = Address::derive("deployer");
        let rtv = Arc::new(Token::retriever(
            Address::derive("contract:rtv"),
            admin,
            Amount::from_whole(1_000_000),
        ));
        // Six decimals, like the real Tether.
        let usdt = Arc::new(Token::new(TokenConfig {
            address: Address::derive("contract:usdt"),
            name: "Tether".into(),
            symbol: "USDT".into(),
            decimals: 6,
            max_supply: None,
            minter: admin,
        }));
        let registry = Arc::new(PriceOracleRegistry::new());
        for (symbol, answer) in [("RTV", 50_000_000i128), ("USDT", 100_000_000)] {
            registry
                .register_feed(
                    symbol,
                    Arc::new(MockAggregator::new(
                        Address::derive(symbol),
                        symbol,
                        FEED_DECIMALS,
                        answer,
                    )),
                )
                .unwrap();
        }
        let sale = PrivateSale::new(PrivateSaleConfig {
            address: Address::derive("contract:sale"),
            admin,
            max_supply: Amount::from_whole(1_000_000),
            base_token: rtv.clone(),
            base_reference_symbol: "rtv".into(),
            registry,
            collateral: vec![usdt.clone()],
        })
        .unwrap();
        Fixture {
            admin,
            rtv,
            usdt,
            sale,
        }
    }

    #[test]
    fn allocation_is_share_of_max_supply() {
        let f = fixture();
        assert_eq!(f.sale.tokens_allocated_for_sale(), Amount::from_whole(100_000));
        assert_eq!(f.sale.status(), SaleStatus::NotStarted);
        assert!(!f.sale.private_sale_status());
        assert_eq!(f.sale.accepted_assets(), vec!["USDT".to_string()]);
    }

    #[test]
    fn six_decimal_collateral_is_normalized() {
        let f = fixture();
        // 10 USDT at $1, RTV at $0.50 -> 20 RTV.
        let quote = f.sale.quote("usdt", Amount::from_units(10_000_000)).unwrap();
        assert_eq!(quote, Amount::from_whole(20));
    }

    #[test]
    fn whitelist_is_admin_only_and_idempotent() {
        let f = fixture();
        let investor = Address::derive("investor");
        assert!(matches!(
            f.sale.whitelist(&investor, &investor),
            Err(SaleError::Unauthorized { .. })
        ));
        f.sale.whitelist(&f.admin, &investor).unwrap();
        f.sale.whitelist(&f.admin, &investor).unwrap();
        assert!(f.sale.is_whitelisted(&investor));
        let whitelisted = f
            .sale
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, SaleEvent::Whitelisted { .. }))
            .count();
        assert_eq!(whitelisted, 1);
    }

    #[test]
    fn start_requires_funding_and_happens_once() {
        let f = fixture();
        assert!(matches!(
            f.sale.start_sale(&f.admin),
            Err(SaleError::InsufficientAllocation { .. })
        ));
        f.rtv
            .mint(&f.admin, &f.sale.address(), f.sale.tokens_allocated_for_sale())
            .unwrap();
        f.sale.start_sale(&f.admin).unwrap();
        assert!(f.sale.private_sale_status());
        assert_eq!(f.sale.start_sale(&f.admin), Err(SaleError::AlreadyRunning));
    }

    #[test]
    fn sale_address_cannot_buy_from_itself() {
        let f = fixture();
        let sale = f.sale.address();
        f.rtv
            .mint(&f.admin, &sale, f.sale.tokens_allocated_for_sale())
            .unwrap();
        f.sale.whitelist(&f.admin, &sale).unwrap();
        f.sale.start_sale(&f.admin).unwrap();
        f.usdt.mint(&f.admin, &sale, Amount::from_units(10_000_000)).unwrap();
        f.usdt.approve(&sale, &sale, Amount::MAX);

        assert!(matches!(
            f.sale.buy(&sale, "USDT", Amount::from_units(10_000_000)),
            Err(SaleError::Unauthorized { .. })
        ));
        assert_eq!(f.sale.remaining_allocation(), f.sale.tokens_allocated_for_sale());
        assert!(f
            .sale
            .take_events()
            .iter()
            .all(|e| !matches!(e, SaleEvent::Purchased(_))));
    }

    #[test]
    fn buy_before_start_rejected() {
        let f = fixture();
        let investor = Address::derive("investor");
        f.sale.whitelist(&f.admin, &investor).unwrap();
        assert_eq!(
            f.sale.buy(&investor, "USDT", Amount::from_units(1)),
            Err(SaleError::NotRunning)
        );
    }

    #[test]
    fn buy_moves_both_assets() {
        let f = fixture();
        let investor = Address::derive("investor");
        f.rtv
            .mint(&f.admin, &f.sale.address(), f.sale.tokens_allocated_for_sale())
            .unwrap();
        f.sale.whitelist(&f.admin, &investor).unwrap();
        f.sale.start_sale(&f.admin).unwrap();

        let ten_usdt = Amount::from_units(10_000_000);
        f.usdt.mint(&f.admin, &investor, ten_usdt).unwrap();
        f.usdt.approve(&investor, &f.sale.address(), ten_usdt);

        let purchase = f.sale.buy(&investor, "USDT", ten_usdt).unwrap();
        assert_eq!(purchase.base_amount, Amount::from_whole(20));
        assert_eq!(f.rtv.balance_of(&investor), Amount::from_whole(20));
        assert_eq!(f.usdt.balance_of(&investor), Amount::ZERO);
        assert_eq!(f.sale.collateral_balance("USDT").unwrap(), ten_usdt);
        assert_eq!(f.sale.remaining_allocation(), Amount::from_whole(99_980));
    }

    #[test]
    fn failed_collateral_leg_moves_nothing() {
        let f = fixture();
        let investor = Address::derive("investor");
        f.rtv
            .mint(&f.admin, &f.sale.address(), f.sale.tokens_allocated_for_sale())
            .unwrap();
        f.sale.whitelist(&f.admin, &investor).unwrap();
        f.sale.start_sale(&f.admin).unwrap();
        f.usdt.mint(&f.admin, &investor, Amount::from_units(10_000_000)).unwrap();
        // No approval.
        let err = f.sale.buy(&investor, "USDT", Amount::from_units(10_000_000)).unwrap_err();
        assert!(matches!(err, SaleError::Token(TokenError::InsufficientAllowance { .. })));
        assert_eq!(f.sale.remaining_allocation(), Amount::from_whole(100_000));
        assert_eq!(f.rtv.balance_of(&investor), Amount::ZERO);
    }

    #[test]
    fn withdraw_collateral_is_admin_only() {
        let f = fixture();
        let investor = Address::derive("investor");
        let treasury = Address::derive("treasury");
        f.rtv
            .mint(&f.admin, &f.sale.address(), f.sale.tokens_allocated_for_sale())
            .unwrap();
        f.sale.whitelist(&f.admin, &investor).unwrap();
        f.sale.start_sale(&f.admin).unwrap();
        let amount = Amount::from_units(4_000_000);
        f.usdt.mint(&f.admin, &investor, amount).unwrap();
        f.usdt.approve(&investor, &f.sale.address(), amount);
        f.sale.buy(&investor, "USDT", amount).unwrap();

        assert!(matches!(
            f.sale.withdraw_collateral(&investor, "USDT", &investor, amount),
            Err(SaleError::Unauthorized { .. })
        ));
        f.sale.withdraw_collateral(&f.admin, "USDT", &treasury, amount).unwrap();
        assert_eq!(f.usdt.balance_of(&treasury), amount);
        assert_eq!(f.sale.collateral_balance("USDT").unwrap(), Amount::ZERO);
    }

    #[test]
    fn config_without_feed_rejected() {
        let admin = Address::derive("deployer");
        let rtv = Arc::new(Token::retriever(Address::derive("rtv"), admin, Amount::from_whole(1)));
        let result = PrivateSale::new(PrivateSaleConfig {
            address: Address::derive("sale"),
            admin,
            max_supply: Amount::from_whole(1),
            base_token: rtv,
            base_reference_symbol: "RTV".into(),
            registry: Arc::new(PriceOracleRegistry::new()),
            collateral: vec![],
        });
        assert!(matches!(result, Err(SaleError::InvalidConfig(_))));
    }

    #[test]
    fn base_token_as_collateral_rejected() {
        let f = fixture();
        let registry = Arc::new(PriceOracleRegistry::new());
        registry
            .register_feed(
                "RTV",
                Arc::new(MockAggregator::new(Address::derive("f"), "RTV", 8, 100_000_000)),
            )
            .unwrap();
        let result = PrivateSale::new(PrivateSaleConfig {
            address: Address::derive("sale2"),
            admin: f.admin,
            max_supply: Amount::from_whole(1),
            base_token: f.rtv.clone(),
            base_reference_symbol: "RTV".into(),
            registry,
            collateral: vec![f.rtv.clone()],
        });
        assert!(matches!(result, Err(SaleError::InvalidConfig(_))));
    }
}
