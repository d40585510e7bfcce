// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Arbitrary precision integer and fixed-point decimal arithmetic.
//!
//! Integers are plain [BigInt] values. Decimals are [Dec], a [BigInt] mantissa scaled by
//! 10^[PRECISION], the ledger's decimal representation. All decimal operations truncate toward
//! zero.

use std::{
    fmt,
    ops::{Add, Mul, Sub},
    str::FromStr,
};

use num_bigint::BigInt;
use num_integer::Roots;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of fractional decimal digits carried by [Dec].
pub const PRECISION: u32 = 18;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    #[error("division by zero in {0}")]
    DivisionByZero(&'static str),

    #[error("invalid decimal string {0:?}")]
    InvalidDecimal(String),

    #[error("cannot take a fractional power of negative base {0}")]
    NegativeBase(Dec),

    #[error("exponent {0} is out of range")]
    InvalidExponent(Dec),
}

fn scale_factor() -> BigInt {
    num_traits::pow(BigInt::from(10u8), PRECISION as usize)
}

/// Parse a base 10 integer with an optional sign. Unlike [BigInt::from_str], digit separators
/// are rejected.
pub fn parse_int(s: &str) -> Option<BigInt> {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigInt::from_str(s).ok()
}

/// Signed fixed-point decimal with [PRECISION] fractional digits.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(BigInt);

impl Dec {
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn one() -> Self {
        Self(scale_factor())
    }

    /// Build a decimal from its raw scaled mantissa.
    pub fn from_mantissa(mantissa: BigInt) -> Self {
        Self(mantissa)
    }

    pub fn mantissa(&self) -> &BigInt {
        &self.0
    }

    pub fn from_int(value: &BigInt) -> Self {
        Self(value * scale_factor())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Integer part, truncated toward zero.
    pub fn truncate(&self) -> BigInt {
        &self.0 / scale_factor()
    }

    pub fn mul_int(&self, rhs: &BigInt) -> Dec {
        Dec(&self.0 * rhs)
    }

    /// Truncating division. Returns `None` when `rhs` is zero.
    pub fn checked_div(&self, rhs: &Dec) -> Option<Dec> {
        if rhs.is_zero() {
            return None;
        }
        Some(Dec(&self.0 * scale_factor() / &rhs.0))
    }

    /// Truncating division by an integer. Returns `None` when `rhs` is zero.
    pub fn checked_div_int(&self, rhs: &BigInt) -> Option<Dec> {
        if rhs.is_zero() {
            return None;
        }
        Some(Dec(&self.0 / rhs))
    }

    /// Raise `self` to `exponent`, where the exponent is applied as the fraction
    /// `trunc(exponent * denominator) / denominator`.
    ///
    /// The result is exact up to truncation: the mantissa is raised to the integer numerator and
    /// the floor integer root of degree `denominator` is taken of the rescaled value.
    pub fn frac_pow(&self, exponent: &Dec, denominator: u32) -> Result<Dec, NumericError> {
        if denominator == 0 {
            return Err(NumericError::DivisionByZero("fractional power"));
        }
        if self.is_negative() {
            return Err(NumericError::NegativeBase(self.clone()));
        }
        let numerator = exponent.mul_int(&BigInt::from(denominator)).truncate();
        let numerator = numerator
            .to_u32()
            .ok_or_else(|| NumericError::InvalidExponent(exponent.clone()))?;
        if numerator == 0 {
            return Ok(Dec::one());
        }

        // (m / S)^(n / d) * S == ((m^n * S^d) / S^n)^(1 / d)
        let scale = scale_factor();
        let raised = num_traits::pow(self.0.clone(), numerator as usize)
            * num_traits::pow(scale.clone(), denominator as usize)
            / num_traits::pow(scale, numerator as usize);
        Ok(Dec(Roots::nth_root(&raised, denominator)))
    }
}

impl From<BigInt> for Dec {
    fn from(value: BigInt) -> Self {
        Dec::from_int(&value)
    }
}

impl From<i64> for Dec {
    fn from(value: i64) -> Self {
        Dec::from_int(&BigInt::from(value))
    }
}

impl Add for &Dec {
    type Output = Dec;

    fn add(self, rhs: &Dec) -> Dec {
        Dec(&self.0 + &rhs.0)
    }
}

impl Add for Dec {
    type Output = Dec;

    fn add(self, rhs: Dec) -> Dec {
        Dec(self.0 + rhs.0)
    }
}

impl Sub for &Dec {
    type Output = Dec;

    fn sub(self, rhs: &Dec) -> Dec {
        Dec(&self.0 - &rhs.0)
    }
}

impl Mul for &Dec {
    type Output = Dec;

    fn mul(self, rhs: &Dec) -> Dec {
        Dec(&self.0 * &rhs.0 / scale_factor())
    }
}

impl std::iter::Sum for Dec {
    fn sum<I: Iterator<Item = Dec>>(iter: I) -> Self {
        iter.fold(Dec::zero(), |acc, d| acc + d)
    }
}

impl<'a> std::iter::Sum<&'a Dec> for Dec {
    fn sum<I: Iterator<Item = &'a Dec>>(iter: I) -> Self {
        iter.fold(Dec::zero(), |acc, d| &acc + d)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = scale_factor();
        let abs = self.0.abs();
        let int_part = &abs / &scale;
        let frac_part = (&abs % &scale).to_string();
        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "{sign}{int_part}.{frac_part:0>width$}", width = PRECISION as usize)
    }
}

impl FromStr for Dec {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NumericError::InvalidDecimal(s.to_string());

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((_, "")) => return Err(invalid()),
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (body, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }
        if frac_part.len() > PRECISION as usize {
            return Err(invalid());
        }

        let digits = format!("{int_part}{frac_part:0<width$}", width = PRECISION as usize);
        let mantissa = BigInt::from_str(&digits).map_err(|_| invalid())?;
        Ok(Dec(if negative { -mantissa } else { mantissa }))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
