//! # Retriever Contracts
//!
//! The Retriever token economy as a set of in-process contracts sharing one
//! base currency:
//!
//! - **Token**: capped fungible ledger. RTV is one instance; the collateral
//!   assets accepted by the private sale are others.
//! - **Oracle**: symbol → price-feed registry that normalizes 8-decimal
//!   feed answers into 18-decimal amounts.
//! - **Private Sale**: whitelist-gated, oracle-priced sale of a fixed RTV
//!   allocation against several collateral assets.
//! - **Creator Market**: per-creator bonding-curve pools with buy, redeem
//!   and creator-to-creator swap against a shared RTV reserve.
//! - **Devnet**: wires all of the above together with mock feeds, for the
//!   node's simulation and for tests.
//!
//! ## Design Principles
//!
//! 1. Money never wraps. Amounts are 256-bit and every operation is checked.
//! 2. Validate everything, then write everything. A failed call leaves no
//!    trace in any ledger or pool.
//! 3. Locks are taken in one global order (pools by creator address, then
//!    ledgers by token address), so concurrent callers cannot deadlock.
//! 4. Privileged calls take the caller's address and compare it against the
//!    one identity allowed to make them.

pub mod creator_market;
pub mod devnet;
pub mod oracle;
pub mod private_sale;
pub mod token;
