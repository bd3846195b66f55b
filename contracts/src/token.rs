//! # Token Ledger Contract
//!
//! A fungible balance ledger with an optional supply cap. The Retriever
//! base currency (RTV) is one instance; the collateral assets accepted by
//! the private sale (WETH, USDT, MATIC on devnet) are others.
//!
//! ## Security Model
//!
//! - **Mint gating**: only the configured minter identity may mint. The
//!   check is a plain address comparison against the caller.
//! - **Supply cap**: a capped token rejects any mint that would push
//!   `total_supply` past `max_supply`, leaving the supply untouched.
//! - **Allowances**: `approve` overwrites; `transfer_from` spends the
//!   allowance down by exactly the transferred amount.
//! - **Atomicity**: every operation validates in full before writing, so a
//!   failed call leaves balances, allowances and supply unmodified.
//!
//! ## Locking
//!
//! Ledger state sits behind a `parking_lot::Mutex`. Contracts that move
//! several assets in one step take a [`LedgerGuard`] for each ledger, always
//! in ascending address order via [`Token::lock_pair`], validate every leg,
//! and only then apply them.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use retriever_protocol::config::{BASE_TOKEN_NAME, BASE_TOKEN_SYMBOL, DECIMALS};
use retriever_protocol::{Address, Amount, MathError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The caller is not the minter of this token.
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// What the caller attempted.
        action: &'static str,
    },

    /// Minting would push the total supply past the cap.
    #[error("supply cap exceeded: requested {requested}, only {available} mintable")]
    SupplyCapExceeded {
        /// Amount the caller tried to mint.
        requested: Amount,
        /// Headroom left under the cap.
        available: Amount,
    },

    /// The account does not hold enough tokens.
    #[error("insufficient balance: {account} has {balance}, needs {requested}")]
    InsufficientBalance {
        /// The account being debited.
        account: Address,
        /// Its current balance.
        balance: Amount,
        /// The amount requested.
        requested: Amount,
    },

    /// The spender's allowance is too small.
    #[error("insufficient allowance: {spender} may spend {allowance} of {owner}, needs {requested}")]
    InsufficientAllowance {
        /// The account whose tokens are being spent.
        owner: Address,
        /// The account doing the spending.
        spender: Address,
        /// Current allowance.
        allowance: Amount,
        /// The amount requested.
        requested: Amount,
    },

    /// Tokens cannot be minted or sent to the zero address.
    #[error("zero address is not a valid recipient")]
    ZeroAddress,

    /// Both sides of a paired lock refer to the same ledger.
    #[error("cannot lock ledger {0} twice")]
    DuplicateLedger(Address),

    /// Arithmetic failure.
    #[error(transparent)]
    Math(#[from] MathError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Construction parameters for a [`Token`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// The ledger's own address.
    pub address: Address,
    /// Human-readable name (e.g., "RETRIEVER").
    pub name: String,
    /// Ticker symbol (e.g., "RTV").
    pub symbol: String,
    /// Decimal places of the smallest unit.
    pub decimals: u8,
    /// Immutable supply cap. `None` for uncapped tokens.
    pub max_supply: Option<Amount>,
    /// The only identity allowed to mint.
    pub minter: Address,
}

/// Observable ledger events, journaled for indexers and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenEvent {
    /// New supply credited to `to`.
    Mint {
        /// Recipient of the new supply.
        to: Address,
        /// Amount minted.
        amount: Amount,
        /// When the mint happened.
        at: DateTime<Utc>,
    },
    /// Supply destroyed from `from`.
    Burn {
        /// Holder whose balance shrank.
        from: Address,
        /// Amount burned.
        amount: Amount,
        /// When the burn happened.
        at: DateTime<Utc>,
    },
    /// Balance moved between holders, directly or through an allowance.
    Transfer {
        /// Debited holder.
        from: Address,
        /// Credited holder.
        to: Address,
        /// Amount moved.
        amount: Amount,
        /// When the transfer happened.
        at: DateTime<Utc>,
    },
    /// An allowance was set, replacing any previous one.
    Approval {
        /// Holder granting the allowance.
        owner: Address,
        /// Account allowed to spend.
        spender: Address,
        /// New allowance.
        amount: Amount,
        /// When the approval happened.
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Default)]
struct LedgerState {
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    events: Vec<TokenEvent>,
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A fungible token ledger.
///
/// `Token` is `Send + Sync`; share it behind an `Arc` between the contracts
/// that move funds through it.
#[derive(Debug)]
pub struct Token {
    address: Address,
    name: String,
    symbol: String,
    decimals: u8,
    max_supply: Option<Amount>,
    minter: Address,
    state: Mutex<LedgerState>,
}

impl Token {
    /// Creates a ledger with zero supply.
    pub fn new(config: TokenConfig) -> Self {
        Self {
            address: config.address,
            name: config.name,
            symbol: config.symbol.to_uppercase(),
            decimals: config.decimals,
            max_supply: config.max_supply,
            minter: config.minter,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Creates the Retriever base currency with the given cap.
    pub fn retriever(address: Address, minter: Address, max_supply: Amount) -> Self {
        Self::new(TokenConfig {
            address,
            name: BASE_TOKEN_NAME.to_string(),
            symbol: BASE_TOKEN_SYMBOL.to_string(),
            decimals: DECIMALS,
            max_supply: Some(max_supply),
            minter,
        })
    }

    /// The ledger's own address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upper-cased ticker symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Decimal places of the smallest unit.
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// The supply cap, or `None` if uncapped.
    pub fn max_supply(&self) -> Option<Amount> {
        self.max_supply
    }

    /// The minter identity.
    pub fn minter(&self) -> Address {
        self.minter
    }

    /// Current total supply.
    pub fn total_supply(&self) -> Amount {
        self.lock().total_supply()
    }

    /// Balance of `owner`, zero if unknown.
    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.lock().balance_of(owner)
    }

    /// Remaining allowance of `spender` over `owner`'s tokens.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.lock().allowance(owner, spender)
    }

    /// Mints `amount` to `to`. Only the minter may call this.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Unauthorized`] if `caller` is not the minter,
    /// [`TokenError::ZeroAddress`] for the zero recipient and
    /// [`TokenError::SupplyCapExceeded`] if the cap would be breached.
    pub fn mint(&self, caller: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        self.lock().mint(caller, to, amount)
    }

    /// Burns `amount` of the caller's own balance.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InsufficientBalance`] if the caller holds less.
    pub fn burn(&self, caller: &Address, amount: Amount) -> Result<(), TokenError> {
        self.lock().burn(caller, amount)
    }

    /// Moves `amount` from the caller to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InsufficientBalance`] or [`TokenError::ZeroAddress`].
    pub fn transfer(&self, caller: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        self.lock().transfer(caller, to, amount)
    }

    /// Sets the allowance of `spender` over the caller's tokens to `amount`.
    pub fn approve(&self, caller: &Address, spender: &Address, amount: Amount) {
        self.lock().approve(caller, spender, amount)
    }

    /// Moves `amount` from `from` to `to`, spending the caller's allowance.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InsufficientAllowance`] or
    /// [`TokenError::InsufficientBalance`].
    pub fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.lock().transfer_from(caller, from, to, amount)
    }

    /// Drains the event journal.
    pub fn take_events(&self) -> Vec<TokenEvent> {
        let mut guard = self.lock();
        std::mem::take(&mut guard.state.events)
    }

    /// Snapshot of every non-zero balance, ordered by address.
    pub fn balances(&self) -> BTreeMap<Address, Amount> {
        self.lock()
            .state
            .balances
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(owner, amount)| (*owner, *amount))
            .collect()
    }

    /// Locks the ledger for a multi-step operation.
    pub fn lock(&self) -> LedgerGuard<'_> {
        LedgerGuard {
            token: self,
            state: self.state.lock(),
        }
    }

    /// Locks two distinct ledgers in ascending address order and returns
    /// the guards in argument order.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::DuplicateLedger`] if both arguments share an
    /// address, since the second lock would never be granted.
    pub fn lock_pair<'a>(
        first: &'a Token,
        second: &'a Token,
    ) -> Result<(LedgerGuard<'a>, LedgerGuard<'a>), TokenError> {
        if first.address == second.address {
            return Err(TokenError::DuplicateLedger(first.address));
        }
        if first.address < second.address {
            let a = first.lock();
            let b = second.lock();
            Ok((a, b))
        } else {
            let b = second.lock();
            let a = first.lock();
            Ok((a, b))
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerGuard
// ---------------------------------------------------------------------------

/// Exclusive access to one ledger for the duration of a transaction.
///
/// The `check_*` methods validate without writing. The mutating methods
/// validate first too, so each is atomic on its own; a caller composing
/// several legs runs every `check_*` before the first write.
pub struct LedgerGuard<'a> {
    token: &'a Token,
    state: MutexGuard<'a, LedgerState>,
}

impl<'a> LedgerGuard<'a> {
    /// The locked ledger.
    pub fn token(&self) -> &Token {
        self.token
    }

    /// Current total supply.
    pub fn total_supply(&self) -> Amount {
        self.state.total_supply
    }

    /// Balance of `owner`.
    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.state.balances.get(owner).copied().unwrap_or(Amount::ZERO)
    }

    /// Allowance of `spender` over `owner`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.state
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Validates a transfer without applying it.
    pub fn check_transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                account: *from,
                balance,
                requested: amount,
            });
        }
        if from != to {
            self.balance_of(to).checked_add(amount)?;
        }
        Ok(())
    }

    /// Validates an allowance-gated transfer without applying it.
    pub fn check_transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: *from,
                spender: *spender,
                allowance,
                requested: amount,
            });
        }
        self.check_transfer(from, to, amount)
    }

    /// See [`Token::transfer`].
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        self.check_transfer(from, to, amount)?;
        self.move_balance(from, to, amount)?;
        self.state.events.push(TokenEvent::Transfer {
            from: *from,
            to: *to,
            amount,
            at: Utc::now(),
        });
        tracing::debug!(
            token = %self.token.symbol,
            from = %from.short(),
            to = %to.short(),
            amount = %amount,
            "transfer"
        );
        Ok(())
    }

    /// See [`Token::transfer_from`].
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.check_transfer_from(spender, from, to, amount)?;
        let remaining = self.allowance(from, spender).checked_sub(amount)?;
        self.transfer(from, to, amount)?;
        self.state.allowances.insert((*from, *spender), remaining);
        Ok(())
    }

    /// See [`Token::approve`].
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) {
        self.state.allowances.insert((*owner, *spender), amount);
        self.state.events.push(TokenEvent::Approval {
            owner: *owner,
            spender: *spender,
            amount,
            at: Utc::now(),
        });
        tracing::debug!(
            token = %self.token.symbol,
            owner = %owner.short(),
            spender = %spender.short(),
            amount = %amount,
            "approve"
        );
    }

    /// See [`Token::mint`].
    pub fn mint(&mut self, caller: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        if *caller != self.token.minter {
            tracing::warn!(token = %self.token.symbol, caller = %caller, "rejected mint from non-minter");
            return Err(TokenError::Unauthorized {
                caller: *caller,
                action: "mint",
            });
        }
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }

        let new_supply = self.state.total_supply.checked_add(amount)?;
        if let Some(cap) = self.token.max_supply {
            if new_supply > cap {
                return Err(TokenError::SupplyCapExceeded {
                    requested: amount,
                    available: cap.checked_sub(self.state.total_supply)?,
                });
            }
        }
        let new_balance = self.balance_of(to).checked_add(amount)?;

        self.state.total_supply = new_supply;
        self.state.balances.insert(*to, new_balance);
        self.state.events.push(TokenEvent::Mint {
            to: *to,
            amount,
            at: Utc::now(),
        });
        tracing::debug!(
            token = %self.token.symbol,
            to = %to.short(),
            amount = %amount,
            total_supply = %new_supply,
            "mint"
        );
        Ok(())
    }

    /// See [`Token::burn`].
    pub fn burn(&mut self, from: &Address, amount: Amount) -> Result<(), TokenError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                account: *from,
                balance,
                requested: amount,
            });
        }
        let new_supply = self.state.total_supply.checked_sub(amount)?;

        self.state.balances.insert(*from, balance.checked_sub(amount)?);
        self.state.total_supply = new_supply;
        self.state.events.push(TokenEvent::Burn {
            from: *from,
            amount,
            at: Utc::now(),
        });
        tracing::debug!(token = %self.token.symbol, from = %from.short(), amount = %amount, "burn");
        Ok(())
    }

    // Caller has already run `check_transfer`.
    fn move_balance(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        if from == to {
            return Ok(());
        }
        let from_balance = self.balance_of(from).checked_sub(amount)?;
        let to_balance = self.balance_of(to).checked_add(amount)?;
        self.state.balances.insert(*from, from_balance);
        self.state.balances.insert(*to, to_balance);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
