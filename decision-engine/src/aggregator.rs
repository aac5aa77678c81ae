use fund_core::model::{Action, ConsensusOpinion, InstrumentId, Signal};

/// Weight gap below which two actions are considered tied.
pub const TIE_EPSILON: f64 = 1e-6;

/// Reduces one instrument's signals into a single consensus opinion.
///
/// Each signal votes with weight = confidence; the action with the
/// highest total weight wins. Ties within epsilon fail toward inaction:
/// HOLD beats both, and SELL beats BUY (de-risking over risk-taking).
/// Strength rewards clear majorities: (winner - runner-up) / total.
///
/// Deterministic and pure; the orchestrator's quorum rule guarantees the
/// input is non-empty.
pub fn aggregate(instrument: &InstrumentId, signals: &[Signal]) -> ConsensusOpinion {
    let mut buy_weight = 0.0;
    let mut sell_weight = 0.0;
    let mut hold_weight = 0.0;
    for signal in signals {
        match signal.action() {
            Action::Buy => buy_weight += signal.confidence(),
            Action::Sell => sell_weight += signal.confidence(),
            Action::Hold => hold_weight += signal.confidence(),
        }
    }
    let total = buy_weight + sell_weight + hold_weight;

    // Tie preference order: HOLD, then SELL, then BUY. Scanning in that
    // order with a strictly-greater-than-epsilon test makes the earlier
    // candidate win any tie.
    let ranked = [
        (Action::Hold, hold_weight),
        (Action::Sell, sell_weight),
        (Action::Buy, buy_weight),
    ];
    let mut winner = ranked[0];
    for candidate in &ranked[1..] {
        if candidate.1 > winner.1 + TIE_EPSILON {
            winner = *candidate;
        }
    }
    let (action, winning_weight) = winner;

    let runner_up = ranked
        .iter()
        .filter(|(a, _)| *a != action)
        .map(|(_, w)| *w)
        .fold(0.0, f64::max);

    let strength = if total > 0.0 {
        ((winning_weight - runner_up) / total).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let dissent_count = signals.iter().filter(|s| s.action() != action).count();

    ConsensusOpinion::new(
        instrument.clone(),
        action,
        strength,
        signals.to_vec(),
        dissent_count,
    )
}
