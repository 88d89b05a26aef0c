use crate::instrument::{InstrumentKind, NormalizedLeg};

/// Terminal payoff of one leg at price S_T.
///
/// Call:     max(S_T - K, 0) * q
/// Put:      max(K - S_T, 0) * q
/// Equity:   S_T * q
/// RiskFree: K' * q          (K' = compounded principal, independent of S_T)
///
/// Quantity sign flows through linearly. Pure function, no allocations.
#[inline]
pub fn payoff(leg: &NormalizedLeg, price: f64) -> f64 {
    match leg.kind {
        InstrumentKind::Call => (price - leg.strike).max(0.0) * leg.quantity,
        InstrumentKind::Put => (leg.strike - price).max(0.0) * leg.quantity,
        InstrumentKind::Equity => price * leg.quantity,
        InstrumentKind::RiskFree => leg.strike * leg.quantity,
    }
}

/// Net profit/loss of one leg at price S_T: payoff - cost. Not floored.
#[inline]
pub fn result(leg: &NormalizedLeg, price: f64) -> f64 {
    payoff(leg, price) - leg.cost
}
