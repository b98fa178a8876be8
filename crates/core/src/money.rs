//! Rupee amounts.
//!
//! Amounts are accumulated exactly and only rounded to paise when they are
//! presented (display, payment links).

use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul, Sub};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// An amount of Indian rupees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Whole rupees.
    pub fn rupees(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }

    /// Amount expressed in paise (`12_345` -> `₹123.45`).
    pub fn from_paise(paise: i64) -> Self {
        Self(Decimal::new(paise, 2))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Clamp negative amounts to zero.
    pub fn floor_zero(self) -> Self {
        if self.0.is_sign_negative() {
            Self::ZERO
        } else {
            self
        }
    }

    /// Round to the smallest currency unit (paise), half away from zero.
    pub fn rounded(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Whole percent this amount is of `whole`, rounded down (`0` when `whole` is zero).
    pub fn whole_percent_of(&self, whole: Money) -> u32 {
        if whole.0.is_zero() {
            return 0;
        }
        (self.0 * Decimal::ONE_HUNDRED / whole.0)
            .floor()
            .to_u32()
            .unwrap_or(0)
    }

    /// Fixed two-decimal form without separators, as UPI links expect.
    pub fn upi_amount(&self) -> String {
        format!("{:.2}", self.rounded().0)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Money;

    fn mul(self, rhs: u32) -> Money {
        Money(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl core::str::FromStr for Money {
    type Err = rust_decimal::Error;

    /// Plain decimal rupees (`"40"`, `"12.50"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str_exact(s.trim()).map(Money)
    }
}

impl core::fmt::Display for Money {
    /// `₹1,23,456.5`: Indian digit grouping, at most two fraction digits.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let rounded = self.rounded().0.normalize();
        let text = rounded.abs().to_string();
        let (int_part, frac_part) = match text.split_once('.') {
            Some((i, fr)) => (i, Some(fr)),
            None => (text.as_str(), None),
        };

        if rounded.is_sign_negative() && !rounded.is_zero() {
            f.write_str("-")?;
        }
        f.write_str("₹")?;
        f.write_str(&group_indian(int_part))?;
        if let Some(fr) = frac_part {
            write!(f, ".{fr}")?;
        }
        Ok(())
    }
}

/// Group an unsigned digit string as `12,34,567`: the last three digits
/// together, every two before that.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (left, right) = rest.split_at(rest.len() - 2);
        groups.push(right);
        rest = left;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}
