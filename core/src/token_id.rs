use std::{borrow::Cow, fmt, str};

use serde::{Deserialize, Serialize};

/// identifies an asset unit moved by a transaction.
///
/// A string identifier; the sentinel [`TokenId::LOVELACE`] denotes the
/// native coin, everything else is a native token unit (policy-hash and
/// asset-name concatenated as hex).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(Cow<'static, str>);

impl TokenId {
    /// the sentinel unit denoting the native coin.
    pub const LOVELACE: Self = Self(Cow::Borrowed("lovelace"));

    #[inline]
    pub fn new(token_id: impl Into<Cow<'static, str>>) -> Self {
        Self(token_id.into())
    }

    /// create a static [`TokenId`]. Because we use a [`Cow`]
    /// internally this allows us to defined pre-defined static
    /// [`TokenId`] without having to do extra allocations etc.
    pub const fn new_static(token_id: &'static str) -> Self {
        Self(Cow::Borrowed(token_id))
    }

    #[inline]
    pub fn is_lovelace(&self) -> bool {
        self.0 == Self::LOVELACE.0
    }
}

impl AsRef<str> for TokenId {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl Default for TokenId {
    fn default() -> Self {
        TokenId::LOVELACE
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl str::FromStr for TokenId {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.to_owned()))
    }
}
