//! Shared token alias table
//!
//! Centralizes the loose currency names users type ("usd", "Ethereum", "$eth")
//! and maps them onto canonical tickers. The table is open-world: anything it
//! does not recognize is taken to already be a ticker and is only uppercased.
//!
//! This module is the single source of truth for currency naming.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Canonical ticker produced by [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, schemars::JsonSchema)]
#[serde(transparent)]
pub struct CurrencySymbol(String);

impl CurrencySymbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CurrencySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CurrencySymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Deserialized symbols go back through the alias table so a record read from
// the wire can never hold a non-canonical ticker.
impl<'de> Deserialize<'de> for CurrencySymbol {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(normalize(&raw))
    }
}

/// Canonical tickers that have aliases
pub mod symbols {
    pub const USDC: &str = "USDC";
    pub const USDT: &str = "USDT";
    pub const ETH: &str = "ETH";
    pub const BTC: &str = "BTC";
    pub const SOL: &str = "SOL";
}

/// Alias lookup table (keys are uppercased, single-spaced)
pub struct AliasTable {
    aliases: HashMap<&'static str, &'static str>,
}

impl AliasTable {
    /// Create the table with every built-in alias
    pub fn new() -> Self {
        use symbols::*;

        let mut aliases = HashMap::new();

        // Dollar names always mean the USDC stablecoin
        aliases.insert("USD", USDC);
        aliases.insert("US DOLLAR", USDC);
        aliases.insert("US DOLLARS", USDC);
        aliases.insert("DOLLAR", USDC);
        aliases.insert("DOLLARS", USDC);
        aliases.insert("USD COIN", USDC);

        aliases.insert("TETHER", USDT);

        aliases.insert("ETHEREUM", ETH);
        aliases.insert("ETHER", ETH);

        aliases.insert("BITCOIN", BTC);
        aliases.insert("XBT", BTC);

        aliases.insert("SOLANA", SOL);

        Self { aliases }
    }

    /// Canonical ticker for an already-folded key, if it is an alias
    pub fn lookup(&self, key: &str) -> Option<&'static str> {
        self.aliases.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Map a raw currency name onto its canonical ticker.
    ///
    /// Total: unknown names come back trimmed and uppercased.
    pub fn normalize(&self, raw: &str) -> CurrencySymbol {
        let key = fold(raw);
        match self.lookup(&key) {
            Some(canonical) => CurrencySymbol(canonical.to_string()),
            None => CurrencySymbol(key),
        }
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim, drop a leading `$`, collapse inner whitespace, uppercase.
fn fold(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);
    trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Global alias table (lazy initialized)
static ALIASES: std::sync::OnceLock<AliasTable> = std::sync::OnceLock::new();

/// Get the global alias table
pub fn alias_table() -> &'static AliasTable {
    ALIASES.get_or_init(AliasTable::new)
}

/// Normalize a currency name with the global alias table
pub fn normalize(raw: &str) -> CurrencySymbol {
    alias_table().normalize(raw)
}
