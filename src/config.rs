//! Chain configuration.

use serde::{Deserialize, Serialize};

/// Configuration shared by pull and relay chains.
///
/// Controls how string steps are split into segments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Separates steps inside a string specification.
    /// Default: `/`
    pub delimiter: char,

    /// Placed before the delimiter to keep it literal.
    /// Default: `\`
    pub escape: char,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            delimiter: '/',
            escape: '\\',
        }
    }
}

impl ChainConfig {
    /// Use a different segment delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }
}
