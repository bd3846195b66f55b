//! # Creator Market Contract
//!
//! Per-creator bonding-curve pools backed by a shared RTV reserve.
//!
//! Every creator gets one pool holding three things: the creator-token
//! supply, the RTV reserve backing it, and the holder balances. The curve is
//! constant-ratio: the price of one creator token is `reserve / supply`, and
//! both buy and redeem trade at that price.
//!
//! ```text
//! buy:     minted = base * supply / reserve          (floor)
//! redeem:  payout = tokens * reserve / supply        (floor)
//! swap:    redeem on A without paying out, then buy on B with the payout
//! ```
//!
//! Flooring in both directions means a buy followed by a redeem of the
//! minted amount never returns more than was deposited.
//!
//! ## Edge cases
//!
//! - A pool whose supply was fully redeemed holds zero reserve. The next buy
//!   re-seeds it at 1:1, the same ratio `add_creator` uses.
//! - A trade that would mint zero tokens or pay out zero RTV is rejected with
//!   [`MarketError::DustAmount`] rather than silently absorbing the input.
//!
//! ## Locking
//!
//! Pools live in a `DashMap`, each behind its own `Mutex`. An operation that
//! touches several pools locks them by ascending creator address. An
//! operation that also moves RTV locks the base ledger after every pool it
//! needs. `swap` keeps the reserve inside the market and never touches the
//! ledger at all. Onboarding and [`CreatorMarket::audit`] additionally
//! serialize on a market-wide mutex so that an audit never sees RTV that has
//! arrived for a pool that is not yet listed.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use retriever_protocol::config::DECIMALS;
use retriever_protocol::math::{mul_div, SCALE};
use retriever_protocol::{Address, Amount, MathError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::token::{Token, TokenError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during creator-market operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    /// Only the market owner or the creator may onboard a creator, and the
    /// market's own address may not trade.
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// What the caller attempted.
        action: &'static str,
    },

    /// The creator already has a pool.
    #[error("creator {0} already exists")]
    CreatorAlreadyExists(Address),

    /// No pool exists for this creator or creator-token address.
    #[error("creator not found: {0}")]
    CreatorNotFound(Address),

    /// The holder owns fewer creator tokens than requested.
    #[error("insufficient creator token balance: {holder} holds {balance} of {creator}, needs {requested}")]
    InsufficientCreatorTokenBalance {
        /// The creator whose token is short.
        creator: Address,
        /// The holder being debited.
        holder: Address,
        /// Current balance.
        balance: Amount,
        /// The amount requested.
        requested: Amount,
    },

    /// Trades must move a non-zero amount.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// The input is too small to produce any output at the current ratio.
    #[error("amount {0} is too small to trade at the current price")]
    DustAmount(Amount),

    /// A swap must name two different creator tokens.
    #[error("cannot swap creator token {0} into itself")]
    SelfSwap(Address),

    /// [`CreatorMarket::audit`] found inconsistent accounting.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    /// A base-ledger operation failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Arithmetic failure.
    #[error(transparent)]
    Math(#[from] MathError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Public metadata and counters for one creator token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorTokenInfo {
    /// Creator the pool belongs to.
    pub creator: Address,
    /// Derived creator-token address.
    pub token_address: Address,
    /// Display name given at onboarding.
    pub name: String,
    /// Upper-cased ticker.
    pub symbol: String,
    /// Always 18, like RTV.
    pub decimals: u8,
    /// Creator tokens outstanding.
    pub supply: Amount,
    /// RTV backing the supply.
    pub reserve: Amount,
    /// Holders with a non-zero balance.
    pub holders: usize,
    /// When the creator was onboarded.
    pub created_at: DateTime<Utc>,
}

/// Result of a buy or redeem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReceipt {
    /// Creator whose pool was traded.
    pub creator: Address,
    /// Account that bought or redeemed.
    pub trader: Address,
    /// RTV paid in (buy) or out (redeem).
    pub base_amount: Amount,
    /// Creator tokens minted (buy) or burned (redeem).
    pub token_amount: Amount,
    /// Pool supply after the trade.
    pub supply_after: Amount,
    /// Pool reserve after the trade.
    pub reserve_after: Amount,
    /// When the trade settled.
    pub at: DateTime<Utc>,
}

/// Result of a creator-to-creator swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    /// Account that swapped.
    pub trader: Address,
    /// Creator whose tokens were burned.
    pub from_creator: Address,
    /// Creator whose tokens were minted.
    pub to_creator: Address,
    /// Source tokens burned.
    pub amount_in: Amount,
    /// RTV moved from the source reserve to the destination reserve.
    pub base_amount: Amount,
    /// Destination tokens minted.
    pub amount_out: Amount,
    /// When the swap settled.
    pub at: DateTime<Utc>,
}

/// Observable market events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarketEvent {
    /// A creator pool was opened.
    CreatorAdded {
        /// The onboarded creator.
        creator: Address,
        /// Derived creator-token address.
        token_address: Address,
        /// Upper-cased ticker.
        symbol: String,
        /// RTV seeded into the reserve, also the initial supply.
        initial_liquidity: Amount,
        /// When the pool opened.
        at: DateTime<Utc>,
    },
    /// RTV in, creator tokens minted.
    Bought(TradeReceipt),
    /// Creator tokens burned, RTV out.
    Redeemed(TradeReceipt),
    /// Creator tokens exchanged through the reserves.
    Swapped(SwapReceipt),
}

/// Per-creator line of an [`AuditReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorAudit {
    /// Audited creator.
    pub creator: Address,
    /// Supply, equal to the sum of holder balances.
    pub supply: Amount,
    /// RTV reserve of the pool.
    pub reserve: Amount,
    /// Holders with a non-zero balance.
    pub holders: usize,
}

/// Snapshot produced by a successful [`CreatorMarket::audit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// One line per creator, in creator-address order.
    pub creators: Vec<CreatorAudit>,
    /// Sum of all pool reserves.
    pub total_reserve: Amount,
    /// RTV actually held by the market.
    pub base_balance: Amount,
    /// RTV sent to the market directly, outside any pool.
    pub unallocated_base: Amount,
    /// When the audit ran.
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
struct CreatorPool {
    creator: Address,
    token_address: Address,
    name: String,
    symbol: String,
    supply: Amount,
    reserve: Amount,
    balances: BTreeMap<Address, Amount>,
    created_at: DateTime<Utc>,
}

/// New pool counters computed by a `plan_*` call, applied by `commit`.
#[derive(Debug, Clone, Copy)]
struct PoolUpdate {
    holder: Address,
    holder_balance: Amount,
    supply: Amount,
    reserve: Amount,
}

impl CreatorPool {
    fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(Amount::ZERO)
    }

    fn quote_buy(&self, base_amount: Amount) -> Result<Amount, MarketError> {
        if base_amount.is_zero() {
            return Err(MarketError::ZeroAmount);
        }
        let minted = if self.supply.is_zero() {
            base_amount
        } else {
            mul_div(base_amount, self.supply, self.reserve)?
        };
        if minted.is_zero() {
            return Err(MarketError::DustAmount(base_amount));
        }
        Ok(minted)
    }

    fn quote_redeem(&self, token_amount: Amount) -> Result<Amount, MarketError> {
        if token_amount.is_zero() {
            return Err(MarketError::ZeroAmount);
        }
        // Only reachable from a bare quote; holders never own more than the supply.
        if token_amount > self.supply {
            return Err(MarketError::InsufficientCreatorTokenBalance {
                creator: self.creator,
                holder: Address::ZERO,
                balance: self.supply,
                requested: token_amount,
            });
        }
        let payout = mul_div(token_amount, self.reserve, self.supply)?;
        if payout.is_zero() {
            return Err(MarketError::DustAmount(token_amount));
        }
        Ok(payout)
    }

    fn plan_buy(&self, holder: &Address, base_amount: Amount) -> Result<(Amount, PoolUpdate), MarketError> {
        let minted = self.quote_buy(base_amount)?;
        let update = PoolUpdate {
            holder: *holder,
            holder_balance: self.balance_of(holder).checked_add(minted)?,
            supply: self.supply.checked_add(minted)?,
            reserve: self.reserve.checked_add(base_amount)?,
        };
        Ok((minted, update))
    }

    fn plan_redeem(&self, holder: &Address, token_amount: Amount) -> Result<(Amount, PoolUpdate), MarketError> {
        let balance = self.balance_of(holder);
        if balance < token_amount {
            return Err(MarketError::InsufficientCreatorTokenBalance {
                creator: self.creator,
                holder: *holder,
                balance,
                requested: token_amount,
            });
        }
        let payout = self.quote_redeem(token_amount)?;
        let update = PoolUpdate {
            holder: *holder,
            holder_balance: balance.checked_sub(token_amount)?,
            supply: self.supply.checked_sub(token_amount)?,
            reserve: self.reserve.checked_sub(payout)?,
        };
        Ok((payout, update))
    }

    fn commit(&mut self, update: PoolUpdate) {
        if update.holder_balance.is_zero() {
            self.balances.remove(&update.holder);
        } else {
            self.balances.insert(update.holder, update.holder_balance);
        }
        self.supply = update.supply;
        self.reserve = update.reserve;
    }

    fn spot_price(&self) -> Result<Amount, MathError> {
        if self.supply.is_zero() {
            return Ok(Amount::from_units(SCALE));
        }
        mul_div(self.reserve, Amount::from_units(SCALE), self.supply)
    }

    fn info(&self) -> CreatorTokenInfo {
        CreatorTokenInfo {
            creator: self.creator,
            token_address: self.token_address,
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: DECIMALS,
            supply: self.supply,
            reserve: self.reserve,
            holders: self.balances.len(),
            created_at: self.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// CreatorMarket
// ---------------------------------------------------------------------------

/// The creator bonding-curve market.
#[derive(Debug)]
pub struct CreatorMarket {
    address: Address,
    owner: Address,
    base_token: Arc<Token>,
    pools: DashMap<Address, Arc<Mutex<CreatorPool>>>,
    /// Creator-token address → creator.
    token_index: DashMap<Address, Address>,
    onboarding: Mutex<()>,
    events: Mutex<Vec<MarketEvent>>,
}

impl CreatorMarket {
    /// Creates an empty market settling in `base_token`.
    pub fn new(address: Address, owner: Address, base_token: Arc<Token>) -> Self {
        Self {
            address,
            owner,
            base_token,
            pools: DashMap::new(),
            token_index: DashMap::new(),
            onboarding: Mutex::new(()),
            events: Mutex::new(Vec::new()),
        }
    }

    /// The market's own address; it holds every reserve.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The market owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// The RTV ledger address.
    pub fn base_token_address(&self) -> Address {
        self.base_token.address()
    }

    /// Onboards `creator` with a pool seeded 1:1 by `initial_liquidity`.
    ///
    /// The market pulls `initial_liquidity` RTV from the creator, so the
    /// creator must have approved the market's address beforehand. Returns
    /// the new creator-token address.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Unauthorized`] unless `caller` is the owner or
    /// the creator, [`MarketError::ZeroAmount`],
    /// [`MarketError::CreatorAlreadyExists`], or the ledger's allowance or
    /// balance error.
    pub fn add_creator(
        &self,
        caller: &Address,
        creator: &Address,
        name: &str,
        symbol: &str,
        initial_liquidity: Amount,
    ) -> Result<Address, MarketError> {
        if caller != &self.owner && caller != creator {
            tracing::warn!(caller = %caller, creator = %creator, "rejected creator onboarding");
            return Err(MarketError::Unauthorized {
                caller: *caller,
                action: "add creator",
            });
        }
        self.ensure_external(creator, "list itself as a creator")?;
        if initial_liquidity.is_zero() {
            return Err(MarketError::ZeroAmount);
        }

        let _onboarding = self.onboarding.lock();
        if self.pools.contains_key(creator) {
            return Err(MarketError::CreatorAlreadyExists(*creator));
        }

        self.base_token
            .lock()
            .transfer_from(&self.address, creator, &self.address, initial_liquidity)?;

        let token_address = self.creator_token_address_for(creator);
        let symbol = symbol.to_uppercase();
        let pool = CreatorPool {
            creator: *creator,
            token_address,
            name: name.to_string(),
            symbol: symbol.clone(),
            supply: initial_liquidity,
            reserve: initial_liquidity,
            balances: BTreeMap::from([(*creator, initial_liquidity)]),
            created_at: Utc::now(),
        };
        self.token_index.insert(token_address, *creator);
        self.pools.insert(*creator, Arc::new(Mutex::new(pool)));

        tracing::info!(
            creator = %creator,
            token = %token_address,
            symbol = %symbol,
            liquidity = %initial_liquidity.display_decimal(),
            "creator added"
        );
        self.events.lock().push(MarketEvent::CreatorAdded {
            creator: *creator,
            token_address,
            symbol,
            initial_liquidity,
            at: Utc::now(),
        });
        Ok(token_address)
    }

    /// Buys `creator`'s token with `base_amount` RTV.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Unauthorized`] if `caller` is the market itself,
    /// [`MarketError::CreatorNotFound`], [`MarketError::ZeroAmount`],
    /// [`MarketError::DustAmount`], or the ledger's allowance or balance
    /// error. On any error nothing moves.
    pub fn buy(&self, caller: &Address, creator: &Address, base_amount: Amount) -> Result<TradeReceipt, MarketError> {
        self.ensure_external(caller, "buy")?;
        let handle = self.pool(creator)?;
        let mut pool = handle.lock();
        let (minted, update) = pool.plan_buy(caller, base_amount)?;

        let mut ledger = self.base_token.lock();
        ledger.transfer_from(&self.address, caller, &self.address, base_amount)?;
        pool.commit(update);
        drop(ledger);

        let receipt = TradeReceipt {
            creator: *creator,
            trader: *caller,
            base_amount,
            token_amount: minted,
            supply_after: pool.supply,
            reserve_after: pool.reserve,
            at: Utc::now(),
        };
        tracing::debug!(
            creator = %creator.short(),
            trader = %caller.short(),
            paid = %base_amount,
            minted = %minted,
            "creator token bought"
        );
        self.events.lock().push(MarketEvent::Bought(receipt.clone()));
        Ok(receipt)
    }

    /// Redeems `token_amount` of `creator`'s token for RTV.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Unauthorized`] if `caller` is the market itself,
    /// [`MarketError::CreatorNotFound`], [`MarketError::ZeroAmount`],
    /// [`MarketError::InsufficientCreatorTokenBalance`], or
    /// [`MarketError::DustAmount`]. On any error nothing moves.
    pub fn redeem(
        &self,
        caller: &Address,
        creator: &Address,
        token_amount: Amount,
    ) -> Result<TradeReceipt, MarketError> {
        self.ensure_external(caller, "redeem")?;
        let handle = self.pool(creator)?;
        let mut pool = handle.lock();
        let (payout, update) = pool.plan_redeem(caller, token_amount)?;

        let mut ledger = self.base_token.lock();
        ledger.transfer(&self.address, caller, payout)?;
        pool.commit(update);
        drop(ledger);

        let receipt = TradeReceipt {
            creator: *creator,
            trader: *caller,
            base_amount: payout,
            token_amount,
            supply_after: pool.supply,
            reserve_after: pool.reserve,
            at: Utc::now(),
        };
        tracing::debug!(
            creator = %creator.short(),
            trader = %caller.short(),
            burned = %token_amount,
            paid_out = %payout,
            "creator token redeemed"
        );
        self.events.lock().push(MarketEvent::Redeemed(receipt.clone()));
        Ok(receipt)
    }

    /// Swaps `amount` of one creator token into another, both named by
    /// creator-token address. The RTV redeemed from the source pool moves
    /// straight into the destination reserve.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Unauthorized`] if `caller` is the market itself,
    /// [`MarketError::SelfSwap`], [`MarketError::CreatorNotFound`]
    /// for either token, or whichever redeem or buy error the legs raise.
    /// Neither leg applies unless both succeed.
    pub fn swap(
        &self,
        caller: &Address,
        from_token: &Address,
        amount: Amount,
        to_token: &Address,
    ) -> Result<SwapReceipt, MarketError> {
        self.ensure_external(caller, "swap")?;
        if from_token == to_token {
            return Err(MarketError::SelfSwap(*from_token));
        }
        let from_creator = self.creator_for_token(from_token)?;
        let to_creator = self.creator_for_token(to_token)?;
        let source_handle = self.pool(&from_creator)?;
        let target_handle = self.pool(&to_creator)?;

        let (mut source, mut target) = if from_creator < to_creator {
            let s = source_handle.lock();
            let t = target_handle.lock();
            (s, t)
        } else {
            let t = target_handle.lock();
            let s = source_handle.lock();
            (s, t)
        };

        let (base_amount, redeem) = source.plan_redeem(caller, amount)?;
        let (minted, buy) = target.plan_buy(caller, base_amount)?;
        source.commit(redeem);
        target.commit(buy);
        drop((source, target));

        let receipt = SwapReceipt {
            trader: *caller,
            from_creator,
            to_creator,
            amount_in: amount,
            base_amount,
            amount_out: minted,
            at: Utc::now(),
        };
        tracing::debug!(
            trader = %caller.short(),
            from = %from_creator.short(),
            to = %to_creator.short(),
            amount_in = %amount,
            amount_out = %minted,
            "creator tokens swapped"
        );
        self.events.lock().push(MarketEvent::Swapped(receipt.clone()));
        Ok(receipt)
    }

    /// Creator-token supply of `creator`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::CreatorNotFound`].
    pub fn current_supply(&self, creator: &Address) -> Result<Amount, MarketError> {
        Ok(self.pool(creator)?.lock().supply)
    }

    /// RTV reserve backing `creator`'s token.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::CreatorNotFound`].
    pub fn reserve_balance(&self, creator: &Address) -> Result<Amount, MarketError> {
        Ok(self.pool(creator)?.lock().reserve)
    }

    /// `user`'s balance of `creator`'s token.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::CreatorNotFound`].
    pub fn user_balance(&self, creator: &Address, user: &Address) -> Result<Amount, MarketError> {
        Ok(self.pool(creator)?.lock().balance_of(user))
    }

    /// The token address of `creator`, if onboarded.
    pub fn creator_token_address(&self, creator: &Address) -> Option<Address> {
        self.pools.get(creator).map(|_| self.creator_token_address_for(creator))
    }

    /// Metadata and counters for `creator`'s token.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::CreatorNotFound`].
    pub fn creator_token_info(&self, creator: &Address) -> Result<CreatorTokenInfo, MarketError> {
        Ok(self.pool(creator)?.lock().info())
    }

    /// RTV per creator token at the current ratio, 18 decimals.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::CreatorNotFound`].
    pub fn spot_price(&self, creator: &Address) -> Result<Amount, MarketError> {
        Ok(self.pool(creator)?.lock().spot_price()?)
    }

    /// Creator tokens a buy of `base_amount` would mint right now.
    ///
    /// # Errors
    ///
    /// Same as [`CreatorMarket::buy`] minus the ledger checks.
    pub fn quote_buy(&self, creator: &Address, base_amount: Amount) -> Result<Amount, MarketError> {
        self.pool(creator)?.lock().quote_buy(base_amount)
    }

    /// RTV a redeem of `token_amount` would pay right now.
    ///
    /// # Errors
    ///
    /// Same as [`CreatorMarket::redeem`] minus the holder check.
    pub fn quote_redeem(&self, creator: &Address, token_amount: Amount) -> Result<Amount, MarketError> {
        self.pool(creator)?.lock().quote_redeem(token_amount)
    }

    /// Every onboarded creator, sorted.
    pub fn creators(&self) -> Vec<Address> {
        let mut creators: Vec<Address> = self.pools.iter().map(|entry| *entry.key()).collect();
        creators.sort();
        creators
    }

    /// Recomputes every pool's holder sum and the market's RTV coverage.
    ///
    /// Locks all pools (ascending creator address) and then the base ledger,
    /// so the report is a consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvariantViolated`] if a pool's holder balances
    /// do not sum to its supply, a pool holds supply without reserve, or the
    /// market holds less RTV than the reserves add up to.
    pub fn audit(&self) -> Result<AuditReport, MarketError> {
        let _onboarding = self.onboarding.lock();

        let mut pools: Vec<(Address, Arc<Mutex<CreatorPool>>)> = self
            .pools
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        pools.sort_by_key(|(creator, _)| *creator);
        let guards: Vec<_> = pools.iter().map(|(_, pool)| pool.lock()).collect();
        let base_balance = self.base_token.balance_of(&self.address);

        let mut creators = Vec::with_capacity(guards.len());
        let mut total_reserve = Amount::ZERO;
        for pool in &guards {
            let held = pool
                .balances
                .values()
                .try_fold(Amount::ZERO, |acc, balance| acc.checked_add(*balance))?;
            if held != pool.supply {
                return Err(MarketError::InvariantViolated(format!(
                    "creator {}: holders own {} but supply is {}",
                    pool.creator, held, pool.supply
                )));
            }
            if !pool.supply.is_zero() && pool.reserve.is_zero() {
                return Err(MarketError::InvariantViolated(format!(
                    "creator {}: supply {} has no reserve",
                    pool.creator, pool.supply
                )));
            }
            total_reserve = total_reserve.checked_add(pool.reserve)?;
            creators.push(CreatorAudit {
                creator: pool.creator,
                supply: pool.supply,
                reserve: pool.reserve,
                holders: pool.balances.len(),
            });
        }

        let unallocated_base = base_balance.checked_sub(total_reserve).map_err(|_| {
            MarketError::InvariantViolated(format!(
                "market holds {base_balance} RTV against {total_reserve} in reserves"
            ))
        })?;

        tracing::info!(
            creators = creators.len(),
            total_reserve = %total_reserve.display_decimal(),
            "market audit passed"
        );
        Ok(AuditReport {
            creators,
            total_reserve,
            base_balance,
            unallocated_base,
            at: Utc::now(),
        })
    }

    /// Drains the event journal.
    pub fn take_events(&self) -> Vec<MarketEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// The market's own address never trades or lists; its ledger pulls
    /// would be self-transfers.
    fn ensure_external(&self, who: &Address, action: &'static str) -> Result<(), MarketError> {
        if who == &self.address {
            tracing::warn!(action, "rejected market self-call");
            return Err(MarketError::Unauthorized { caller: *who, action });
        }
        Ok(())
    }

    fn pool(&self, creator: &Address) -> Result<Arc<Mutex<CreatorPool>>, MarketError> {
        self.pools
            .get(creator)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(MarketError::CreatorNotFound(*creator))
    }

    fn creator_for_token(&self, token: &Address) -> Result<Address, MarketError> {
        self.token_index
            .get(token)
            .map(|entry| *entry.value())
            .ok_or(MarketError::CreatorNotFound(*token))
    }

    fn creator_token_address_for(&self, creator: &Address) -> Address {
        Address::derive(&format!("creator-token:{}:{}", self.address, creator))
    }
}
