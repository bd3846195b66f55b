//! # Identity Module
//!
//! Every participant in Retriever (wallets, contracts, price feeds, creator
//! tokens) is identified by an [`Address`]. Authorization is a plain
//! identity comparison: privileged operations take the caller's address
//! and check it against the one identity allowed to perform them.

pub mod address;

pub use address::{Address, AddressError, ADDRESS_LENGTH};
