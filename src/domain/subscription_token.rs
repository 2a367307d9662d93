use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Opaque bearer credential used in confirm/unsubscribe links.
/// Generated tokens carry 128 random bits rendered as a hyphenated UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(String);

impl SubscriptionToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl AsRef<str> for SubscriptionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Any presented string is a candidate token; unknown ones simply match nothing
impl FromStr for SubscriptionToken {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Infallible> {
        Ok(Self(value.to_string()))
    }
}

impl From<String> for SubscriptionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}
