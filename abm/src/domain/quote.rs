//! Quotes
//!
//! Ephemeral limit orders produced per agent per tick.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSide {
    Buy,
    Sell,
    None,
}

/// Limit order derived from a signed desired quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub side: QuoteSide,
    /// Integer limit price, >= 1
    pub limit_price: i64,
    /// Positive for buys, negative for sells, 0 for no quote
    pub signed_qty: i64,
}

impl Quote {
    /// Quote that never executes
    pub fn none(price: i64) -> Self {
        Self {
            side: QuoteSide::None,
            limit_price: price,
            signed_qty: 0,
        }
    }

    pub fn quantity(&self) -> i64 {
        self.signed_qty.abs()
    }

    /// Whether the limit is compatible with the prevailing market price
    pub fn crosses(&self, market_price: i64) -> bool {
        match self.side {
            QuoteSide::Buy => self.limit_price >= market_price,
            QuoteSide::Sell => self.limit_price <= market_price,
            QuoteSide::None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crosses() {
        let buy = Quote {
            side: QuoteSide::Buy,
            limit_price: 31,
            signed_qty: 5,
        };
        assert!(buy.crosses(30));
        assert!(buy.crosses(31));
        assert!(!buy.crosses(32));

        let sell = Quote {
            side: QuoteSide::Sell,
            limit_price: 29,
            signed_qty: -5,
        };
        assert!(sell.crosses(30));
        assert!(!sell.crosses(28));
        assert_eq!(sell.quantity(), 5);

        assert!(!Quote::none(30).crosses(30));
    }
}
