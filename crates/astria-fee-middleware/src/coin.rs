//! Fungible amounts.
//!
//! A [`Coins`] value is a set of [`Coin`]s kept in canonical form: sorted by denomination,
//! at most one entry per denomination and no zero amounts. Every fee component is a
//! [`Coins`] value, so the escrow invariant is checked one denomination at a time.

use std::{
    collections::BTreeMap,
    fmt::{
        self,
        Display,
        Formatter,
    },
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;

static DENOM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9/:._\-]{2,127}$").expect("denom regex is a valid literal")
});

static COIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)([a-zA-Z][a-zA-Z0-9/:._\-]{2,127})$")
        .expect("coin regex is a valid literal")
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoinError {
    #[error("invalid denomination `{denom}`")]
    InvalidDenom { denom: String },
    #[error("coin `{coin}` is not of the form `<amount><denom>`")]
    Malformed { coin: String },
    #[error("amount of coin `{coin}` does not fit into 128 bits")]
    AmountOverflow { coin: String },
}

/// Returns an error if `denom` is not a valid denomination.
///
/// # Errors
/// Returns [`CoinError::InvalidDenom`] if `denom` does not match the denomination grammar.
pub fn validate_denom(denom: &str) -> Result<(), CoinError> {
    if DENOM_RE.is_match(denom) {
        Ok(())
    } else {
        Err(CoinError::InvalidDenom {
            denom: denom.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    #[must_use]
    pub fn new<T: Into<String>>(amount: u128, denom: T) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl Display for Coin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = COIN_RE.captures(s).ok_or_else(|| CoinError::Malformed {
            coin: s.to_string(),
        })?;
        let amount = captures[1]
            .parse::<u128>()
            .map_err(|_| CoinError::AmountOverflow {
                coin: s.to_string(),
            })?;
        Ok(Self::new(amount, &captures[2]))
    }
}

/// A canonical set of coins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Coins(Vec<Coin>);

impl Coins {
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Builds a canonical set from arbitrary coins, merging duplicate denominations and
    /// dropping zero amounts.
    ///
    /// # Errors
    /// Returns an error if a denomination is invalid or if merging overflows.
    pub fn try_from_coins<I: IntoIterator<Item = Coin>>(coins: I) -> Result<Self, CoinError> {
        let mut merged: BTreeMap<String, u128> = BTreeMap::new();
        for coin in coins {
            validate_denom(&coin.denom)?;
            let entry = merged.entry(coin.denom.clone()).or_default();
            *entry = entry
                .checked_add(coin.amount)
                .ok_or_else(|| CoinError::AmountOverflow {
                    coin: coin.to_string(),
                })?;
        }
        Ok(Self(
            merged
                .into_iter()
                .filter(|(_, amount)| *amount > 0)
                .map(|(denom, amount)| Coin::new(amount, denom))
                .collect(),
        ))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    #[must_use]
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0
            .iter()
            .find(|coin| coin.denom == denom)
            .map_or(0, |coin| coin.amount)
    }

    /// Returns the sum of `self` and `other`, or `None` on overflow.
    #[must_use]
    pub fn checked_add(&self, other: &Coins) -> Option<Coins> {
        let mut merged: BTreeMap<&str, u128> = BTreeMap::new();
        for coin in self.0.iter().chain(other.0.iter()) {
            let entry = merged.entry(coin.denom.as_str()).or_default();
            *entry = entry.checked_add(coin.amount)?;
        }
        Some(Coins(
            merged
                .into_iter()
                .map(|(denom, amount)| Coin::new(amount, denom))
                .collect(),
        ))
    }

    /// Returns `self - other`, or `None` if any denomination would go negative.
    #[must_use]
    pub fn checked_sub(&self, other: &Coins) -> Option<Coins> {
        let mut remaining: BTreeMap<&str, u128> = self
            .0
            .iter()
            .map(|coin| (coin.denom.as_str(), coin.amount))
            .collect();
        for coin in &other.0 {
            let entry = remaining.get_mut(coin.denom.as_str())?;
            *entry = entry.checked_sub(coin.amount)?;
        }
        Some(Coins(
            remaining
                .into_iter()
                .filter(|(_, amount)| *amount > 0)
                .map(|(denom, amount)| Coin::new(amount, denom))
                .collect(),
        ))
    }
}

impl Display for Coins {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for coin in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            coin.fmt(f)?;
        }
        Ok(())
    }
}

impl FromStr for Coins {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::empty());
        }
        let coins = s
            .split(',')
            .map(str::parse::<Coin>)
            .collect::<Result<Vec<_>, _>>()?;
        Self::try_from_coins(coins)
    }
}

impl<'a> IntoIterator for &'a Coins {
    type IntoIter = std::slice::Iter<'a, Coin>;
    type Item = &'a Coin;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
