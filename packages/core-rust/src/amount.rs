//! Amount normalization.
//!
//! Callers pass amounts as JSON numbers, numeric strings or already-normalized
//! integers. Everything collapses into one `i64` base-unit representation
//! (tinybars for HBAR, smallest denomination for tokens).

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimal places of HBAR (1 HBAR = 10^8 tinybars).
pub const HBAR_DECIMALS: u32 = 8;

/// Errors from amount normalization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("`{0}` is not a number")]
    NotANumber(String),
    #[error("`{0}` is not a whole number of base units")]
    Fractional(String),
    #[error("`{amount}` has more than {decimals} decimal places")]
    TooPrecise { amount: String, decimals: u32 },
    #[error("`{0}` does not fit in a 64-bit amount")]
    Overflow(String),
}

/// Heterogeneous amount input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Int(i64),
    Float(f64),
    Text(String),
}

impl AmountInput {
    fn to_decimal(&self) -> Result<Decimal, AmountError> {
        match self {
            Self::Int(v) => Ok(Decimal::from(*v)),
            // The shortest decimal that round-trips, so 0.1 stays 0.1 rather
            // than its binary expansion.
            Self::Float(v) if v.is_finite() => Decimal::from_str(&v.to_string())
                .map_err(|_| AmountError::Overflow(v.to_string())),
            Self::Float(v) => Err(AmountError::NotANumber(v.to_string())),
            Self::Text(t) => {
                let trimmed = t.trim();
                Decimal::from_str(trimmed)
                    .or_else(|_| Decimal::from_scientific(trimmed))
                    .map_err(|_| AmountError::NotANumber(t.clone()))
            }
        }
    }

    fn display(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Text(t) => t.clone(),
        }
    }
}

impl From<i64> for AmountInput {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for AmountInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Normalizes an already-in-base-units amount. Absent amounts are zero.
///
/// # Errors
///
/// Returns `AmountError` for non-numeric text, fractional values and values
/// outside `i64`.
pub fn normalize(input: Option<&AmountInput>) -> Result<i64, AmountError> {
    let Some(input) = input else {
        return Ok(0);
    };
    if let AmountInput::Int(v) = input {
        return Ok(*v);
    }
    let value = input.to_decimal()?.normalize();
    if !value.fract().is_zero() {
        return Err(AmountError::Fractional(input.display()));
    }
    value
        .to_i64()
        .ok_or_else(|| AmountError::Overflow(input.display()))
}

/// Converts a display amount (e.g. `"1.5"` HBAR) into base units given the
/// number of decimals of the denomination.
///
/// # Errors
///
/// Returns `AmountError::TooPrecise` when the amount carries more fractional
/// digits than `decimals`, or `Overflow` when the result exceeds `i64`.
pub fn to_base_units(input: &AmountInput, decimals: u32) -> Result<i64, AmountError> {
    let value = input.to_decimal()?.normalize();
    if value.scale() > decimals {
        return Err(AmountError::TooPrecise {
            amount: input.display(),
            decimals,
        });
    }
    let factor = 10_i64
        .checked_pow(decimals)
        .map(Decimal::from)
        .ok_or_else(|| AmountError::Overflow(input.display()))?;
    value
        .checked_mul(factor)
        .and_then(|v| v.to_i64())
        .ok_or_else(|| AmountError::Overflow(input.display()))
}
