use super::instrument::InstrumentId;
use super::market::Prices;
use super::signal::Action;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Position {
    quantity: f64,
    avg_cost: f64,
}

impl Position {
    pub fn new(quantity: f64, avg_cost: f64) -> Self {
        Self { quantity, avg_cost }
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn avg_cost(&self) -> f64 {
        self.avg_cost
    }
}

/// Represents the current state of holdings.
///
/// Read-only while a cycle is deciding; mutated only through
/// `apply_fill` when the execution gateway confirms an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioState {
    cash: f64,
    positions: HashMap<InstrumentId, Position>,
    realized_pnl: f64,
    unrealized_pnl: f64,
    peak_equity: f64,
}

impl PortfolioState {
    pub fn with_cash(cash: f64) -> Self {
        Self {
            cash,
            positions: HashMap::new(),
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            peak_equity: cash,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.unrealized_pnl
    }

    pub fn peak_equity(&self) -> f64 {
        self.peak_equity
    }

    pub fn position(&self, instrument: &InstrumentId) -> Option<&Position> {
        self.positions.get(instrument)
    }

    pub fn quantity(&self, instrument: &InstrumentId) -> f64 {
        self.positions
            .get(instrument)
            .map(|p| p.quantity)
            .unwrap_or(0.0)
    }

    pub fn positions(&self) -> std::collections::hash_map::Iter<'_, InstrumentId, Position> {
        self.positions.iter()
    }

    // Test/bootstrap helper: install an absolute position.
    pub fn set_position(&mut self, instrument: InstrumentId, quantity: f64, avg_cost: f64) {
        if quantity == 0.0 {
            self.positions.remove(&instrument);
        } else {
            self.positions
                .insert(instrument, Position::new(quantity, avg_cost));
        }
    }

    pub fn deposit(&mut self, amount: f64) {
        self.cash += amount;
        self.peak_equity = self.peak_equity.max(self.cash);
    }

    /// Cash plus position value at the given prices. Positions with no
    /// known price contribute their cost basis.
    pub fn equity(&self, prices: &Prices) -> f64 {
        let mut equity = self.cash;
        for (instrument, position) in &self.positions {
            let per_unit = prices
                .get(instrument)
                .map(|p| p.last())
                .unwrap_or(position.avg_cost);
            equity += position.quantity * per_unit;
        }
        equity
    }

    /// Market value of one holding at the given prices.
    pub fn exposure(&self, instrument: &InstrumentId, prices: &Prices) -> f64 {
        match (self.positions.get(instrument), prices.get(instrument)) {
            (Some(position), Some(price)) => position.quantity.abs() * price.last(),
            (Some(position), None) => position.quantity.abs() * position.avg_cost,
            _ => 0.0,
        }
    }

    /// Applies one confirmed (possibly partial) fill.
    ///
    /// Buys move cash into the position at a new average cost; sells
    /// realize PnL against the average cost and never take the position
    /// below zero (the allocator already bounds sells to the holding).
    pub fn apply_fill(
        &mut self,
        instrument: &InstrumentId,
        action: Action,
        quantity: f64,
        price: f64,
    ) {
        if quantity <= 0.0 {
            return;
        }
        match action {
            Action::Buy => {
                let entry = self.positions.entry(instrument.clone()).or_default();
                let new_qty = entry.quantity + quantity;
                entry.avg_cost =
                    (entry.quantity * entry.avg_cost + quantity * price) / new_qty;
                entry.quantity = new_qty;
                self.cash -= quantity * price;
            }
            Action::Sell => {
                if let Some(entry) = self.positions.get_mut(instrument) {
                    let sold = quantity.min(entry.quantity);
                    self.realized_pnl += sold * (price - entry.avg_cost);
                    entry.quantity -= sold;
                    self.cash += sold * price;
                    if entry.quantity <= 0.0 {
                        self.positions.remove(instrument);
                    }
                }
            }
            Action::Hold => {}
        }
    }

    /// Re-marks unrealized PnL and ratchets the equity high-water mark.
    pub fn mark(&mut self, prices: &Prices) {
        let mut unrealized = 0.0;
        for (instrument, position) in &self.positions {
            if let Some(price) = prices.get(instrument) {
                unrealized += position.quantity * (price.last() - position.avg_cost);
            }
        }
        self.unrealized_pnl = unrealized;

        let equity = self.equity(prices);
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::market::Price;

    fn instrument(s: &str) -> InstrumentId {
        InstrumentId::new(s, "TEST")
    }

    fn prices_with(entries: &[(&str, f64)]) -> Prices {
        let mut prices = Prices::default();
        for (sym, last) in entries {
            let id = instrument(sym);
            prices.insert(id.clone(), Price::new(id, *last, *last, *last, 0));
        }
        prices
    }

    #[test]
    fn test_buy_fill_moves_cash_and_averages_cost() {
        let mut p = PortfolioState::with_cash(10_000.0);
        let a = instrument("A");

        p.apply_fill(&a, Action::Buy, 10.0, 100.0);
        p.apply_fill(&a, Action::Buy, 10.0, 200.0);

        assert!((p.cash() - 7_000.0).abs() < 1e-9);
        let pos = p.position(&a).unwrap();
        assert!((pos.quantity() - 20.0).abs() < 1e-9);
        assert!((pos.avg_cost() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_sell_fill_realizes_pnl_and_is_bounded_by_holding() {
        let mut p = PortfolioState::with_cash(0.0);
        let a = instrument("A");
        p.set_position(a.clone(), 10.0, 100.0);

        // Oversized sell only closes what is held.
        p.apply_fill(&a, Action::Sell, 15.0, 120.0);

        assert!(p.position(&a).is_none());
        assert!((p.cash() - 1_200.0).abs() < 1e-9);
        assert!((p.realized_pnl() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_mark_ratchets_peak_equity() {
        let mut p = PortfolioState::with_cash(1_000.0);
        let a = instrument("A");
        p.apply_fill(&a, Action::Buy, 10.0, 100.0);

        p.mark(&prices_with(&[("A", 150.0)]));
        assert!((p.peak_equity() - 1_500.0).abs() < 1e-9);
        assert!((p.unrealized_pnl() - 500.0).abs() < 1e-9);

        // Peak does not decay on the way down.
        p.mark(&prices_with(&[("A", 80.0)]));
        assert!((p.peak_equity() - 1_500.0).abs() < 1e-9);
        assert!((p.unrealized_pnl() + 200.0).abs() < 1e-9);
    }
}
