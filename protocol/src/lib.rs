// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Retriever Protocol: Core Library
//!
//! Shared primitives for the Retriever token economy. The contracts crate
//! builds the base currency, the private sale and the creator market on
//! top of these; nothing here knows about any of them.
//!
//! ## Architecture
//!
//! - **math**: 18-decimal fixed-point amounts over 256-bit integers, with
//!   checked add/sub and a widening, floor-rounding `mul_div`.
//! - **identity**: 20-byte account addresses, derivable from labels.
//! - **config**: Protocol constants: decimals, supply cap, sale allocation,
//!   devnet oracle answers.
//!
//! ## Design Philosophy
//!
//! 1. Money never wraps. Every operation that can overflow returns an error.
//! 2. Rounding always favors the protocol. `mul_div` floors, everywhere.
//! 3. If it touches money, it has tests. Plural.

pub mod config;
pub mod identity;
pub mod math;

pub use identity::Address;
pub use math::{Amount, MathError};
