//! # Scaled Integer Amounts
//!
//! [`Amount`] wraps a `U256` holding an integer number of base units, where
//! one whole token is `10^18` base units. All operations are checked and
//! return [`MathError`] instead of wrapping or panicking.

use std::fmt;
use std::str::FromStr;

use primitive_types::{U256, U512};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DECIMALS;

/// Number of base units in one whole token (`10^18`).
pub const SCALE: u128 = 1_000_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by fixed-point arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    /// The result does not fit in 256 bits.
    #[error("arithmetic overflow")]
    Overflow,

    /// A subtraction would go below zero.
    #[error("arithmetic underflow")]
    Underflow,

    /// `mul_div` was called with a zero denominator.
    #[error("division by zero")]
    DivisionByZero,

    /// A decimal string could not be parsed into base units.
    #[error("invalid decimal amount: {0}")]
    InvalidDecimal(String),
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// An unsigned fixed-point amount with 18 fractional digits.
///
/// The inner value is the count of base units. `Amount::from_whole(5)` is
/// `5 * 10^18` base units; `Amount::from_units(5)` is five base units.
///
/// # Examples
///
/// ```
/// use retriever_protocol::math::Amount;
///
/// let five = Amount::from_whole(5);
/// let parsed: Amount = "5".parse().unwrap();
/// assert_eq!(five, parsed);
/// assert_eq!(five.display_decimal(), "5.000000000000000000");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(U256);

impl Amount {
    /// Zero base units.
    pub const ZERO: Amount = Amount(U256([0, 0, 0, 0]));

    /// The largest representable amount.
    pub const MAX: Amount = Amount(U256([u64::MAX; 4]));

    /// Creates an amount from a raw count of base units.
    pub fn from_units(units: u128) -> Self {
        Amount(U256::from(units))
    }

    /// Creates an amount from whole tokens (`whole * 10^18` base units).
    pub fn from_whole(whole: u64) -> Self {
        // u64::MAX * 10^18 < 2^128, so this never overflows U256.
        Amount(U256::from(whole) * U256::from(SCALE))
    }

    /// Wraps a raw `U256` count of base units.
    pub fn from_raw(raw: U256) -> Self {
        Amount(raw)
    }

    /// Returns the raw count of base units.
    pub fn raw(&self) -> U256 {
        self.0
    }

    /// Returns the base-unit count as `u128`, or `None` if it does not fit.
    pub fn as_u128(&self) -> Option<u128> {
        if self.0.bits() <= 128 {
            Some(self.0.low_u128())
        } else {
            None
        }
    }

    /// Returns `true` if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition.
    ///
    /// # Errors
    ///
    /// Returns [`MathError::Overflow`] if the sum exceeds 256 bits.
    pub fn checked_add(self, other: Amount) -> Result<Amount, MathError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(MathError::Overflow)
    }

    /// Checked subtraction.
    ///
    /// # Errors
    ///
    /// Returns [`MathError::Underflow`] if `other > self`.
    pub fn checked_sub(self, other: Amount) -> Result<Amount, MathError> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or(MathError::Underflow)
    }

    /// `floor(self * numerator / denominator)`. See [`mul_div`].
    pub fn mul_div(self, numerator: Amount, denominator: Amount) -> Result<Amount, MathError> {
        mul_div(self, numerator, denominator)
    }

    /// Renders the amount as a decimal string with all 18 fractional digits.
    ///
    /// `Amount::from_units(1_500_000_000_000_000_000)` becomes `"1.500000000000000000"`.
    pub fn display_decimal(&self) -> String {
        let scale = U256::from(SCALE);
        let whole = self.0 / scale;
        let frac = (self.0 % scale).to_string();
        format!("{}.{:0>width$}", whole, frac, width = DECIMALS as usize)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = MathError;

    /// Parses a decimal string of whole tokens (`"5000"`, `"0.8"`) into
    /// base units. At most 18 fractional digits are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));

        let digits_only = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !digits_only(whole) || !digits_only(frac) {
            return Err(MathError::InvalidDecimal(s.to_string()));
        }
        if frac.len() > DECIMALS as usize {
            return Err(MathError::InvalidDecimal(s.to_string()));
        }

        let whole_units = if whole.is_empty() {
            U256::zero()
        } else {
            U256::from_dec_str(whole).map_err(|_| MathError::Overflow)?
        };
        let frac_units = if frac.is_empty() {
            U256::zero()
        } else {
            let padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
            U256::from_dec_str(&padded).map_err(|_| MathError::InvalidDecimal(s.to_string()))?
        };

        whole_units
            .checked_mul(U256::from(SCALE))
            .and_then(|w| w.checked_add(frac_units))
            .map(Amount)
            .ok_or(MathError::Overflow)
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// `a + b`, failing with [`MathError::Overflow`].
pub fn add(a: Amount, b: Amount) -> Result<Amount, MathError> {
    a.checked_add(b)
}

/// `a - b`, failing with [`MathError::Underflow`] when `b > a`.
pub fn sub(a: Amount, b: Amount) -> Result<Amount, MathError> {
    a.checked_sub(b)
}

/// Computes `floor(a * b / c)` with a 512-bit intermediate product.
///
/// The product of two 256-bit values cannot overflow 512 bits, so the only
/// failure modes are a zero denominator and a quotient wider than 256 bits.
///
/// # Errors
///
/// Returns [`MathError::DivisionByZero`] if `c` is zero and
/// [`MathError::Overflow`] if the quotient does not fit in 256 bits.
pub fn mul_div(a: Amount, b: Amount, c: Amount) -> Result<Amount, MathError> {
    if c.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product: U512 = a.0.full_mul(b.0);
    narrow(product / U512::from(c.0))
}

/// Converts `value` from `from_decimals` precision to `to_decimals` precision.
///
/// Scaling down floors; scaling up fails on overflow.
///
/// # Errors
///
/// Returns [`MathError::Overflow`] if the scaled-up value exceeds 256 bits.
pub fn rescale(value: Amount, from_decimals: u8, to_decimals: u8) -> Result<Amount, MathError> {
    use std::cmp::Ordering;

    match to_decimals.cmp(&from_decimals) {
        Ordering::Equal => Ok(value),
        Ordering::Greater => {
            let factor = pow10(u32::from(to_decimals - from_decimals))?;
            value
                .0
                .checked_mul(factor)
                .map(Amount)
                .ok_or(MathError::Overflow)
        }
        Ordering::Less => {
            // 10^78 and above do not fit; anything divided by them is zero.
            match pow10(u32::from(from_decimals - to_decimals)) {
                Ok(factor) => Ok(Amount(value.0 / factor)),
                Err(_) => Ok(Amount::ZERO),
            }
        }
    }
}

fn pow10(exponent: u32) -> Result<U256, MathError> {
    let ten = U256::from(10u8);
    let mut acc = U256::one();
    for _ in 0..exponent {
        acc = acc.checked_mul(ten).ok_or(MathError::Overflow)?;
    }
    Ok(acc)
}

fn narrow(value: U512) -> Result<Amount, MathError> {
    if value > U512::from(U256::max_value()) {
        return Err(MathError::Overflow);
    }
    let mut buf = [0u8; 64];
    value.to_big_endian(&mut buf);
    Ok(Amount(U256::from_big_endian(&buf[32..])))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
