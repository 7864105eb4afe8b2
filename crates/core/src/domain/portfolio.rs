use serde::{Deserialize, Serialize};

/// One holding in the brokerage account, snapshotted at fetch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Upstream instrument id (FIGI).
    pub figi: String,
    pub ticker: String,
    pub name: String,
    pub instrument_type: String,
    /// May be fractional for funds and currencies.
    pub quantity: f64,
    pub average_price: f64,
    pub current_price: f64,
    /// Unrealized yield in currency units, not percent.
    pub expected_yield: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub positions: Vec<Position>,
    pub total_amount: f64,
    pub expected_yield: f64,
    pub currency: String,
}

impl Portfolio {
    /// Aggregates are always derived from the positions, never set directly.
    pub fn from_positions(positions: Vec<Position>, currency: impl Into<String>) -> Self {
        let total_amount = positions
            .iter()
            .map(|p| p.quantity * p.current_price)
            .sum();
        let expected_yield = positions.iter().map(|p| p.expected_yield).sum();
        Self {
            positions,
            total_amount,
            expected_yield,
            currency: currency.into(),
        }
    }
}
