//! Exact conversion between human-entered decimal amounts and on-chain
//! minimal units. Amounts never pass through floating point; scaling is
//! integer arithmetic with explicit precision and overflow errors.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid decimal amount: {0:?}")]
    Invalid(String),
    #[error("amount has {got} fractional digits; at most {max} are representable on-chain")]
    PrecisionOverflow { got: usize, max: u32 },
    #[error("amount exceeds the representable minimal-unit range")]
    Overflow,
}

/// A non-negative token amount held as a raw minimal-unit integer.
///
/// `minor` is the on-chain quantity (e.g. uscrt); the human-readable
/// decimal form is `minor / 10^decimals` and is only ever produced for
/// display, so no precision is lost between a refresh and a later scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount {
    minor: u128,
    decimals: u32,
}

impl Amount {
    pub fn from_minor(minor: u128, decimals: u32) -> Self {
        Self { minor, decimals }
    }

    pub fn zero(decimals: u32) -> Self {
        Self { minor: 0, decimals }
    }

    /// Parses a user-entered decimal string (e.g. `"10.5"`) into minimal
    /// units, rejecting signs, exponents, and anything with more fractional
    /// digits than the chain can represent.
    pub fn parse(text: &str, decimals: u32) -> Result<Self, AmountError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AmountError::Invalid(text.to_owned()));
        }

        let (int_part, frac_part) = match text.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (text, ""),
        };

        // A second '.' survives in frac_part and fails the digit check below.
        let all_digits = int_part.chars().all(|c| c.is_ascii_digit())
            && frac_part.chars().all(|c| c.is_ascii_digit());
        if !all_digits || (int_part.is_empty() && frac_part.is_empty()) {
            return Err(AmountError::Invalid(text.to_owned()));
        }

        if frac_part.len() > decimals as usize {
            return Err(AmountError::PrecisionOverflow {
                got: frac_part.len(),
                max: decimals,
            });
        }

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| AmountError::Overflow)?
        };
        let frac: u128 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| AmountError::Overflow)?
        };

        let scale = 10u128.pow(decimals);
        let frac_scaled = frac * 10u128.pow(decimals - frac_part.len() as u32);
        let minor = whole
            .checked_mul(scale)
            .and_then(|v| v.checked_add(frac_scaled))
            .ok_or(AmountError::Overflow)?;

        Ok(Self { minor, decimals })
    }

    pub fn minor(&self) -> u128 {
        self.minor
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10u128.pow(self.decimals);
        let whole = self.minor / scale;
        let frac = self.minor % scale;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{frac:0width$}", width = self.decimals as usize);
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}
