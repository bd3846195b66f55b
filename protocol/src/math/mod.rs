//! # Fixed-Point Arithmetic
//!
//! Every balance, reserve, price and supply counter in Retriever is an
//! unsigned 256-bit integer scaled by 10^18. There is no floating point
//! anywhere near money, and no arithmetic that silently wraps.
//!
//! - [`Amount`] is the value type. It is `Copy`, ordered and serializable.
//! - [`mul_div`] is the only way to multiply two amounts. It widens to 512
//!   bits before dividing, then floors the result. Floor rounding is the
//!   system-wide rounding policy: every conversion rounds toward the
//!   protocol, never toward the caller.
//! - [`rescale`] moves a value between decimal precisions (8-decimal oracle
//!   answers, 6-decimal collateral, 18-decimal ledger units).

pub mod fixed;

pub use fixed::{add, mul_div, rescale, sub, Amount, MathError, SCALE};
