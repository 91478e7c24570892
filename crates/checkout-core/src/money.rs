//! # Money Types
//!
//! Currency amounts for swift-checkout-rs.
//! Amounts are held in the smallest currency unit (cents for USD) so that
//! totals mirrored from the remote cart service are never re-rounded locally.

use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
            Currency::CAD => "cad",
            Currency::AUD => "aud",
        }
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, most others have 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Convert a decimal amount to the smallest currency unit.
    /// Rounds half away from zero.
    pub fn to_minor_units(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_minor_units(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::USD
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// A currency amount in smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in smallest currency unit (cents for USD)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Money {
    /// Create from a decimal amount (the wire format of the cart service)
    pub fn from_major(amount: f64, currency: Currency) -> Self {
        Self {
            amount: currency.to_minor_units(amount),
            currency,
        }
    }

    /// Create from smallest unit (cents)
    pub fn from_minor(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// The zero amount
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// Get the decimal amount
    pub fn as_major(&self) -> f64 {
        self.currency.from_minor_units(self.amount)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Multiply by a quantity, saturating rather than wrapping on overflow
    pub fn times(&self, quantity: u32) -> Self {
        Self {
            amount: self.amount.saturating_mul(i64::from(quantity)),
            currency: self.currency,
        }
    }

    /// Add two amounts of the same currency. Returns `None` on currency
    /// mismatch, which the cart service contract rules out.
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        if self.currency != other.currency {
            return None;
        }
        Some(Self {
            amount: self.amount.saturating_add(other.amount),
            currency: self.currency,
        })
    }

    /// Equality within the smallest currency unit. Totals come from a service
    /// that computes in floating point, so mirrored values may be one unit off.
    pub fn approx_eq(&self, other: Money) -> bool {
        self.currency == other.currency && (self.amount - other.amount).abs() <= 1
    }

    /// Format for display (e.g., "$10.00")
    pub fn display(&self) -> String {
        let symbol = match self.currency {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::CAD => "C$",
            Currency::AUD => "A$",
        };
        if self.currency.decimal_places() == 0 {
            format!("{}{}", symbol, self.amount)
        } else {
            format!("{}{:.2}", symbol, self.as_major())
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Sum an iterator of amounts in the given currency
pub fn sum_amounts<'a, I>(amounts: I, currency: Currency) -> Money
where
    I: IntoIterator<Item = &'a Money>,
{
    amounts.into_iter().fold(Money::zero(currency), |acc, m| {
        acc.checked_add(*m).unwrap_or(acc)
    })
}
