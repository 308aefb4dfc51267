//! Soft cap on daily log returns.
//!
//! `r' = tanh(gamma · r) / gamma` leaves small moves almost untouched and
//! squeezes every move into (−1/gamma, 1/gamma). The path is rebuilt from
//! its own first price, so the start is preserved exactly. Re-applying the
//! filter compresses again; it is not idempotent.

use crate::types::PRICE_FLOOR;

/// `gamma <= 0` returns the input unchanged.
pub fn apply_return_capping(prices: &[f64], gamma: f64) -> Vec<f64> {
    if gamma <= 0.0 || prices.len() < 2 {
        return prices.to_vec();
    }
    let start = prices[0];
    let mut capped = Vec::with_capacity(prices.len());
    capped.push(start);

    let mut cumulative = 0.0;
    let mut previous = prices[0].max(PRICE_FLOOR).ln();
    for &price in &prices[1..] {
        let current = price.max(PRICE_FLOOR).ln();
        let raw = current - previous;
        cumulative += (gamma * raw).tanh() / gamma;
        capped.push(start * cumulative.exp());
        previous = current;
    }
    capped
}
