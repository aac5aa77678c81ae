use crate::risk_guard::ApprovedOpinion;
use fund_core::model::{Action, Order, PortfolioState, Prices};
use log::warn;
use std::cmp::Ordering;
use uuid::Uuid;

const MIN_NOTIONAL: f64 = 1e-6;

fn risk_score(strength: f64) -> f64 {
    (1.0 - strength).clamp(0.0, 1.0)
}

/// Converts the cycle's approved opinions into concrete orders.
///
/// SELLs go first and are always honored up to the current holding;
/// reducing risk is never capital-constrained. BUYs are then funded
/// greedily in strength order: each is sized to the smaller of its
/// risk-shrunk cap and its strength-proportional share of the risk
/// budget (cash + margin allowance at cycle start), clamped to whatever
/// cash remains. Equal strengths tie-break toward the instrument with
/// lower existing exposure, then by identifier.
pub fn allocate(
    approved: &[ApprovedOpinion],
    portfolio: &PortfolioState,
    prices: &Prices,
    margin_budget: f64,
    timestamp: i64,
) -> Vec<Order> {
    let mut orders = Vec::new();

    for candidate in approved {
        let opinion = candidate.opinion();
        if opinion.action() != Action::Sell {
            continue;
        }
        let held = portfolio.quantity(opinion.instrument());
        if held <= 0.0 {
            continue;
        }
        orders.push(Order::new(
            Uuid::new_v4(),
            opinion.instrument().clone(),
            Action::Sell,
            held,
            None,
            risk_score(opinion.strength()),
            timestamp,
        ));
    }

    let mut buys: Vec<&ApprovedOpinion> = approved
        .iter()
        .filter(|c| c.opinion().action() == Action::Buy)
        .collect();
    buys.sort_by(|a, b| {
        b.opinion()
            .strength()
            .partial_cmp(&a.opinion().strength())
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                let exp_a = portfolio.exposure(a.opinion().instrument(), prices);
                let exp_b = portfolio.exposure(b.opinion().instrument(), prices);
                exp_a.partial_cmp(&exp_b).unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.opinion().instrument().cmp(b.opinion().instrument()))
    });

    let risk_budget = portfolio.cash() + margin_budget;
    let mut remaining = risk_budget;

    for candidate in buys {
        if remaining <= MIN_NOTIONAL {
            break;
        }
        let opinion = candidate.opinion();
        let price = match prices.get(opinion.instrument()) {
            Some(price) if price.last() > 0.0 => price,
            _ => {
                warn!(
                    "Cannot size buy for {}: no usable price",
                    opinion.instrument()
                );
                continue;
            }
        };

        let share = opinion.strength() * risk_budget;
        let desired = match candidate.notional_cap() {
            Some(cap) => cap.min(share),
            None => share,
        };
        let funded = desired.min(remaining);
        if funded <= MIN_NOTIONAL {
            continue;
        }

        orders.push(Order::new(
            Uuid::new_v4(),
            opinion.instrument().clone(),
            Action::Buy,
            funded / price.last(),
            Some(price.ask()),
            risk_score(opinion.strength()),
            timestamp,
        ));
        remaining -= funded;
    }

    orders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk_guard::test_support::{instrument, opinion, prices_with};
    use fund_core::model::InstrumentId;

    fn approved(sym: &str, action: Action, strength: f64, cap: Option<f64>) -> ApprovedOpinion {
        ApprovedOpinion::new(opinion(sym, action, strength), cap)
    }

    fn buy_notional(orders: &[Order], prices: &Prices) -> f64 {
        orders
            .iter()
            .filter(|o| o.action() == Action::Buy)
            .map(|o| {
                let price = prices.get(o.instrument()).map(|p| p.last()).unwrap_or(0.0);
                o.quantity() * price
            })
            .sum()
    }

    #[test]
    fn test_greedy_funding_shrinks_second_buy_to_remaining_cash() {
        // 10,000 cash; two approved BUYs each capped at 8,000 with
        // strengths 0.9 and 0.4: first funds fully, second gets the
        // remaining 2,000 (shrunk by cash, not vetoed).
        let portfolio = PortfolioState::with_cash(10_000.0);
        let prices = prices_with(&[("A", 100.0), ("B", 50.0)]);
        let candidates = vec![
            approved("B", Action::Buy, 0.4, Some(8_000.0)),
            approved("A", Action::Buy, 0.9, Some(8_000.0)),
        ];

        let orders = allocate(&candidates, &portfolio, &prices, 0.0, 0);
        assert_eq!(orders.len(), 2);

        assert_eq!(orders[0].instrument(), &instrument("A"));
        assert!((orders[0].quantity() - 80.0).abs() < 1e-9); // 8,000 @ 100

        assert_eq!(orders[1].instrument(), &instrument("B"));
        assert!((orders[1].quantity() - 40.0).abs() < 1e-9); // 2,000 @ 50
    }

    #[test]
    fn test_buy_notional_never_exceeds_cash() {
        let portfolio = PortfolioState::with_cash(5_000.0);
        let prices = prices_with(&[("A", 10.0), ("B", 20.0), ("C", 30.0)]);
        let candidates = vec![
            approved("A", Action::Buy, 0.9, None),
            approved("B", Action::Buy, 0.8, Some(4_000.0)),
            approved("C", Action::Buy, 0.7, Some(3_000.0)),
        ];

        let orders = allocate(&candidates, &portfolio, &prices, 0.0, 0);
        let total = buy_notional(&orders, &prices);
        assert!(
            total <= 5_000.0 + 1e-9,
            "buy notional {} exceeds cash",
            total
        );
    }

    #[test]
    fn test_sells_are_honored_with_zero_cash() {
        let mut portfolio = PortfolioState::with_cash(0.0);
        portfolio.set_position(instrument("A"), 30.0, 100.0);
        let prices = prices_with(&[("A", 100.0)]);
        let candidates = vec![approved("A", Action::Sell, 0.6, None)];

        let orders = allocate(&candidates, &portfolio, &prices, 0.0, 0);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].action(), Action::Sell);
        assert!((orders[0].quantity() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_hold_produces_no_order() {
        let portfolio = PortfolioState::with_cash(10_000.0);
        let prices = prices_with(&[("A", 100.0)]);
        let candidates = vec![approved("A", Action::Hold, 0.9, None)];

        let orders = allocate(&candidates, &portfolio, &prices, 0.0, 0);
        assert!(orders.is_empty());
    }

    #[test]
    fn test_equal_strength_prefers_lower_exposure_then_identifier() {
        let mut portfolio = PortfolioState::with_cash(1_000.0);
        portfolio.set_position(instrument("A"), 10.0, 100.0);
        let prices = prices_with(&[("A", 100.0), ("B", 100.0), ("C", 100.0)]);

        // A has existing exposure, B and C none. All equal strength; the
        // budget only covers one full share.
        let candidates = vec![
            approved("A", Action::Buy, 0.8, None),
            approved("C", Action::Buy, 0.8, None),
            approved("B", Action::Buy, 0.8, None),
        ];

        let orders = allocate(&candidates, &portfolio, &prices, 0.0, 0);
        let first: &InstrumentId = orders[0].instrument();
        assert_eq!(first, &instrument("B"), "lowest exposure, lowest id first");
    }

    #[test]
    fn test_missing_price_skips_candidate() {
        let portfolio = PortfolioState::with_cash(10_000.0);
        let prices = prices_with(&[("B", 50.0)]);
        let candidates = vec![
            approved("A", Action::Buy, 0.9, None), // no price
            approved("B", Action::Buy, 0.5, None),
        ];

        let orders = allocate(&candidates, &portfolio, &prices, 0.0, 0);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].instrument(), &instrument("B"));
    }
}
