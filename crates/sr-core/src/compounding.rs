//! Compounding conventions.

use serde::{Deserialize, Serialize};

use crate::{Rate, Real, Time};

/// How interest is compounded when quoting a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compounding {
    /// Simple interest: `1 + r·t`
    Simple,
    /// Compounded `n` times a year: `(1 + r/n)^(n·t)`
    Compounded {
        /// Compounding periods per year.
        per_year: u32,
    },
    /// Continuously compounded: `e^(r·t)`
    Continuous,
}

impl Compounding {
    /// Growth factor of one unit invested at `rate` for `t` years.
    pub fn compound_factor(self, rate: Rate, t: Time) -> Real {
        match self {
            Compounding::Simple => 1.0 + rate * t,
            Compounding::Compounded { per_year } => {
                let n = Real::from(per_year.max(1));
                (1.0 + rate / n).powf(n * t)
            }
            Compounding::Continuous => (rate * t).exp(),
        }
    }

    /// The continuously-compounded rate equivalent to `rate` over `t` years.
    pub fn to_continuous(self, rate: Rate, t: Time) -> Rate {
        match self {
            Compounding::Continuous => rate,
            _ if t <= 0.0 => rate,
            _ => self.compound_factor(rate, t).ln() / t,
        }
    }
}
