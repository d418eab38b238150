use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized description of the query filters applied to the source page.
///
/// Scrapes carrying the same signature belong to the same history family, so
/// normalization must be order-insensitive: `sellerCountry=7&language=1` and
/// `language=1&sellerCountry=7` describe the same filter combination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterSignature(String);

impl FilterSignature {
    pub fn parse(query: &str) -> Self {
        let mut pairs: Vec<&str> = query
            .split('&')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .collect();
        pairs.sort_unstable();
        Self(pairs.join("&"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
