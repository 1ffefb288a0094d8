//! Calibration baskets.

use std::sync::Arc;

use sr_core::{Result, Time, Volatility};
use sr_termstructures::YieldTermStructure;

use crate::swaption_helper::{SwaptionHelper, SwaptionQuote};

/// Swaption volatility grid, expiries 1y..5y by tenors 1y..5y.
pub const SWAPTION_VOLS: [[Volatility; 5]; 5] = [
    [0.2050, 0.1920, 0.1830, 0.1740, 0.1620],
    [0.1900, 0.1780, 0.1660, 0.1580, 0.1490],
    [0.1790, 0.1690, 0.1580, 0.1490, 0.1400],
    [0.1680, 0.1580, 0.1490, 0.1390, 0.1300],
    [0.1570, 0.1470, 0.1370, 0.1280, 0.1200],
];

/// Quotes on the anti-diagonal of `grid`: the co-terminal swaptions
/// `1×n, 2×(n−1), …, n×1` that all end at year `n + 1`.
pub fn diagonal_quotes<const N: usize>(grid: &[[Volatility; N]; N]) -> Vec<SwaptionQuote> {
    (0..N)
        .map(|i| SwaptionQuote {
            expiry: (i + 1) as Time,
            tenor: (N - i) as Time,
            volatility: grid[i][N - i - 1],
        })
        .collect()
}

/// Helpers for `quotes` on `curve`, in quote order.
pub fn build_basket(
    curve: &Arc<dyn YieldTermStructure>,
    quotes: &[SwaptionQuote],
) -> Result<Vec<SwaptionHelper>> {
    quotes
        .iter()
        .map(|&q| SwaptionHelper::new(Arc::clone(curve), q))
        .collect()
}

/// The co-terminal 1x5, 2x4, 3x3, 4x2, 5x1 basket on the standard grid.
pub fn diagonal_basket(curve: &Arc<dyn YieldTermStructure>) -> Result<Vec<SwaptionHelper>> {
    build_basket(curve, &diagonal_quotes(&SWAPTION_VOLS))
}
