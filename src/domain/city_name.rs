use std::fmt;
use std::str::FromStr;

use unicode_segmentation::UnicodeSegmentation;

const MAX_LEN: usize = 255;

/// A user supplied city name
#[derive(Debug, PartialEq, Clone)]
pub struct CityName(String);

impl CityName {
    /// Case- and whitespace-insensitive key used for cached weather lookups
    pub fn cache_key(city: &str) -> String {
        format!("weather_{}", city.to_lowercase().replace(' ', "_"))
    }
}

impl AsRef<str> for CityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CityName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().is_empty() {
            return Err("City cannot be empty".into());
        }
        if value.graphemes(true).count() > MAX_LEN {
            return Err(format!("City cannot be longer than {} characters", MAX_LEN));
        }
        Ok(Self(value.to_string()))
    }
}
