use std::{
    fmt::{
        self,
        Display,
        Formatter,
    },
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;

/// The longest address accepted, in bytes.
pub const MAX_ADDRESS_LEN: usize = 128;

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._\-]*$").expect("address regex is a valid literal")
});

/// An account address on either side of a channel.
///
/// The middleware does not interpret addresses beyond checking that they are well formed:
/// non-empty, at most [`MAX_ADDRESS_LEN`] bytes, and free of whitespace and path separators
/// so they can be embedded in storage keys. Counterparty-chain addresses use the same type
/// since their format is owned by the other chain.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(String);

impl Address {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must not be empty")]
    Empty,
    #[error("address `{address}` exceeds the maximum length of {MAX_ADDRESS_LEN} bytes")]
    TooLong { address: String },
    #[error("address `{address}` contains invalid characters")]
    InvalidCharacters { address: String },
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        if s.len() > MAX_ADDRESS_LEN {
            return Err(AddressError::TooLong {
                address: s.to_string(),
            });
        }
        if !ADDRESS_RE.is_match(s) {
            return Err(AddressError::InvalidCharacters {
                address: s.to_string(),
            });
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
