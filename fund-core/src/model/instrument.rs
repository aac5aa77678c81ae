use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Represents a tradable ticker symbol on a specific exchange.
///
/// Serializes as `SYMBOL.EXCHANGE` so it can key the maps in audit
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId {
    symbol: String,
    exchange: String, // e.g. "NSE", "NASDAQ"
}

impl InstrumentId {
    pub fn new(symbol: impl Into<String>, exchange: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: exchange.into(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.symbol, self.exchange)
    }
}

impl Serialize for InstrumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InstrumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.rsplit_once('.') {
            Some((symbol, exchange)) if !symbol.is_empty() && !exchange.is_empty() => {
                Ok(Self::new(symbol, exchange))
            }
            _ => Err(D::Error::custom(format!(
                "expected SYMBOL.EXCHANGE, got {:?}",
                raw
            ))),
        }
    }
}

/// Sector classification used for exposure limits.
/// Instruments the data provider cannot classify fall into `Unclassified`,
/// which is still bounded by the sector-exposure limit like any other sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sector {
    Financials,
    Energy,
    Technology,
    Consumer,
    Industrials,
    Healthcare,
    Materials,
    Utilities,
    Unclassified,
}

impl Default for Sector {
    fn default() -> Self {
        Sector::Unclassified
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sector::Financials => "Financials",
            Sector::Energy => "Energy",
            Sector::Technology => "Technology",
            Sector::Consumer => "Consumer",
            Sector::Industrials => "Industrials",
            Sector::Healthcare => "Healthcare",
            Sector::Materials => "Materials",
            Sector::Utilities => "Utilities",
            Sector::Unclassified => "Unclassified",
        };
        write!(f, "{}", name)
    }
}
