//! Currency-tagged monetary amounts.
//!
//! `Money` is the arithmetic primitive for prices and totals. Amounts are
//! non-negative, always carried at exactly two fractional digits, and rounded
//! half-up at construction. Arithmetic never mixes currencies.

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Number of fractional digits every amount is scaled to.
pub const MONEY_SCALE: u32 = 2;

/// Three-letter, upper-case currency code (e.g. `EUR`).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    pub const EUR: Currency = Currency(*b"EUR");
    pub const USD: Currency = Currency(*b"USD");

    /// Parse a currency code. Only three ASCII upper-case letters are accepted.
    pub fn new(code: &str) -> DomainResult<Self> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(DomainError::validation(format!(
                "currency code must be three upper-case letters, got '{code}'"
            )));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_str(&self) -> &str {
        // Constructed only from ASCII upper-case letters.
        core::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({})", self.as_str())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.as_str().to_string()
    }
}

/// A non-negative amount in a single currency, scaled to two decimals.
///
/// Equality is structural: amount and currency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMoney")]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

/// Unvalidated wire shape; deserialization goes through `Money::of`.
#[derive(Deserialize)]
struct RawMoney {
    amount: Decimal,
    currency: Currency,
}

impl TryFrom<RawMoney> for Money {
    type Error = DomainError;

    fn try_from(raw: RawMoney) -> Result<Self, Self::Error> {
        Money::of(raw.amount, raw.currency)
    }
}

impl Money {
    /// Build an amount, rounding half-up to two decimals.
    ///
    /// Fails with `InvalidAmount` if `raw` is negative.
    pub fn of(raw: Decimal, currency: Currency) -> DomainResult<Self> {
        if raw < Decimal::ZERO {
            return Err(DomainError::invalid_amount(format!(
                "amount cannot be negative (got {raw})"
            )));
        }

        let mut amount = raw.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        amount.rescale(MONEY_SCALE);
        if amount.is_zero() {
            amount.set_sign_positive(true);
        }

        Ok(Self { amount, currency })
    }

    pub fn euro(raw: Decimal) -> DomainResult<Self> {
        Self::of(raw, Currency::EUR)
    }

    pub fn zero(currency: Currency) -> Self {
        let mut amount = Decimal::ZERO;
        amount.rescale(MONEY_SCALE);
        Self { amount, currency }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Sum of two amounts of the same currency.
    pub fn add(&self, other: &Money) -> DomainResult<Money> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| DomainError::validation("money addition overflowed"))?;
        Ok(Self {
            amount,
            currency: self.currency,
        })
    }

    /// Scale the amount by an integer quantity.
    pub fn multiply(&self, quantity: u32) -> DomainResult<Money> {
        let amount = self
            .amount
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| DomainError::validation("money multiplication overflowed"))?;
        Ok(Self {
            amount,
            currency: self.currency,
        })
    }

    fn ensure_same_currency(&self, other: &Money) -> DomainResult<()> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

impl FromStr for Money {
    type Err = DomainError;

    /// Parses `"<amount> <CUR>"`, e.g. `"12.50 EUR"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(amount), Some(code), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(DomainError::validation(format!(
                "expected '<amount> <currency>', got '{s}'"
            )));
        };
        let raw = Decimal::from_str(amount)
            .map_err(|e| DomainError::invalid_amount(format!("'{amount}': {e}")))?;
        Money::of(raw, code.parse()?)
    }
}
