//! Wei-denominated amounts and platform fee arithmetic.
//!
//! Amounts are held as `u128` base units (wei). Conversions to and from
//! ether use decimal-string arithmetic rather than floating point so that
//! round-trips are exact and deposits are computed without precision loss.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wei per ether (10^18).
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Platform surcharge applied atop the task value when funding escrow.
pub const PLATFORM_FEE_PERCENT: u8 = 3;

/// Number of decimal digits in the wei scale.
const ETHER_DECIMALS: usize = 18;

/// A non-negative amount of wei.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WeiAmount(u128);

impl WeiAmount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from raw wei.
    #[must_use]
    pub const fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    /// Returns the raw wei value.
    #[must_use]
    pub const fn as_wei(self) -> u128 {
        self.0
    }

    /// Parses a decimal ether string (`"0.05"`, `"1"`, `"100.25"`) into wei.
    ///
    /// At most 18 fractional digits are accepted; more would require
    /// sub-wei precision and is rejected rather than silently truncated.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidEtherAmount`] on malformed input
    /// and [`TaskDomainError::AmountOverflow`] when the value exceeds
    /// `u128` wei.
    pub fn from_ether(value: &str) -> Result<Self, TaskDomainError> {
        let trimmed = value.trim();
        let invalid = || TaskDomainError::InvalidEtherAmount(value.to_owned());

        let (whole_str, frac_str) = match trimmed.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (trimmed, ""),
        };
        if whole_str.is_empty() && frac_str.is_empty() {
            return Err(invalid());
        }
        if frac_str.len() > ETHER_DECIMALS {
            return Err(invalid());
        }
        let all_digits = |s: &str| s.chars().all(|ch| ch.is_ascii_digit());
        if !all_digits(whole_str) || !all_digits(frac_str) {
            return Err(invalid());
        }

        let whole: u128 = if whole_str.is_empty() {
            0
        } else {
            whole_str.parse().map_err(|_| invalid())?
        };
        let mut frac: u128 = if frac_str.is_empty() {
            0
        } else {
            frac_str.parse().map_err(|_| invalid())?
        };
        for _ in frac_str.len()..ETHER_DECIMALS {
            frac = frac.checked_mul(10).ok_or(TaskDomainError::AmountOverflow)?;
        }

        whole
            .checked_mul(WEI_PER_ETHER)
            .and_then(|wei| wei.checked_add(frac))
            .map(Self)
            .ok_or(TaskDomainError::AmountOverflow)
    }

    /// Formats the amount as a decimal ether string with no trailing zeros.
    #[must_use]
    pub fn to_ether_string(self) -> String {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        if frac == 0 {
            return whole.to_string();
        }
        let padded = format!("{frac:018}");
        let trimmed = padded.trim_end_matches('0');
        format!("{whole}.{trimmed}")
    }

    /// Checked addition.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Checked subtraction.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(diff) => Some(Self(diff)),
            None => None,
        }
    }

    /// Computes the platform fee at the given percentage, rounded down.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::AmountOverflow`] when the intermediate
    /// product exceeds `u128`.
    pub fn platform_fee(self, percent: u8) -> Result<Self, TaskDomainError> {
        self.0
            .checked_mul(u128::from(percent))
            .map(|scaled| Self(scaled / 100))
            .ok_or(TaskDomainError::AmountOverflow)
    }

    /// Computes the escrow deposit: task value plus the platform fee.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::AmountOverflow`] when the deposit exceeds
    /// `u128` wei.
    pub fn deposit_with_fee(self, percent: u8) -> Result<Self, TaskDomainError> {
        let fee = self.platform_fee(percent)?;
        self.checked_add(fee).ok_or(TaskDomainError::AmountOverflow)
    }

    /// Returns true when the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WeiAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.to_ether_string())
    }
}
