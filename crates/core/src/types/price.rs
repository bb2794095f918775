//! Type-safe price representation using decimal arithmetic, plus the cart
//! totals rule (flat shipping fee waived above a subtotal threshold).
//!
//! Prices are in Chilean pesos, which have no minor unit. Decimal arithmetic is
//! still used so that backend values such as `45990.0` never pick up binary
//! floating point error when multiplied and summed.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Subtotals strictly above this amount ship for free.
pub const FREE_SHIPPING_THRESHOLD: Price = Price(Decimal::from_parts(50_000, 0, 0, false, 0));

/// Flat shipping fee charged at or below [`FREE_SHIPPING_THRESHOLD`].
pub const SHIPPING_FLAT_FEE: Price = Price(Decimal::from_parts(3_990, 0, 0, false, 0));

/// A monetary amount.
///
/// Serialized as a JSON number because that is how the catalog backend
/// represents `precio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Zero pesos.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole number of pesos.
    #[must_use]
    pub fn from_whole(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn line_total(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Format for display with thousands separators, e.g. `$45.990`.
    ///
    /// Amounts are rounded to whole pesos.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self.0.round().abs().normalize().to_string();
        let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
        for (i, ch) in rounded.chars().enumerate() {
            if i > 0 && (rounded.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        if self.is_negative() {
            format!("-${grouped}")
        } else {
            format!("${grouped}")
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Derived cart totals.
///
/// Always `total == subtotal + shipping`, where shipping is zero when the
/// subtotal exceeds [`FREE_SHIPPING_THRESHOLD`] and [`SHIPPING_FLAT_FEE`]
/// otherwise (an empty cart included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    /// Sum of line totals.
    pub subtotal: Price,
    /// Shipping cost.
    pub shipping: Price,
    /// `subtotal + shipping`.
    pub total: Price,
}

impl CartTotals {
    /// Derive shipping and total from a subtotal.
    #[must_use]
    pub fn from_subtotal(subtotal: Price) -> Self {
        let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
            Price::ZERO
        } else {
            SHIPPING_FLAT_FEE
        };
        Self {
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }

    /// Derive totals from `(unit price, quantity)` lines.
    #[must_use]
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (Price, u32)>,
    {
        let subtotal = lines
            .into_iter()
            .map(|(price, quantity)| price.line_total(quantity))
            .sum();
        Self::from_subtotal(subtotal)
    }

    /// Whether the shipping fee was waived.
    #[must_use]
    pub fn has_free_shipping(&self) -> bool {
        self.shipping == Price::ZERO
    }
}
