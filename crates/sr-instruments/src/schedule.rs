//! Regular schedules of accrual times.

use serde::{Deserialize, Serialize};
use sr_core::{ensure, Real, Result, Time};
use sr_math::close_enough;
use std::fmt;

/// Payment frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Once per year.
    Annual,
    /// Twice per year.
    Semiannual,
    /// Four times per year.
    Quarterly,
    /// Twelve times per year.
    Monthly,
}

impl Frequency {
    /// Number of periods per year.
    pub fn periods_per_year(self) -> u32 {
        match self {
            Frequency::Annual => 1,
            Frequency::Semiannual => 2,
            Frequency::Quarterly => 4,
            Frequency::Monthly => 12,
        }
    }

    /// Length of one period in years.
    pub fn period(self) -> Time {
        1.0 / self.periods_per_year() as Real
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Annual => "Annual",
            Frequency::Semiannual => "Semiannual",
            Frequency::Quarterly => "Quarterly",
            Frequency::Monthly => "Monthly",
        };
        write!(f, "{s}")
    }
}

/// A strictly increasing sequence of accrual boundary times.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    times: Vec<Time>,
}

impl Schedule {
    /// Generate times forward from `start` every period of `frequency`,
    /// ending exactly at `end`. A final period shorter than a full one is
    /// kept as a short stub.
    pub fn new(start: Time, end: Time, frequency: Frequency) -> Result<Self> {
        ensure!(
            start.is_finite() && end.is_finite() && start >= 0.0,
            InvalidInstrument,
            "schedule bounds must be finite and non-negative, got [{start}, {end}]"
        );
        ensure!(
            end > start,
            InvalidInstrument,
            "schedule end {end} must be after its start {start}"
        );
        let period = frequency.period();
        let mut times = vec![start];
        let mut k = 1;
        loop {
            let t = start + k as Real * period;
            if t >= end || close_enough(t, end, 1000) {
                break;
            }
            times.push(t);
            k += 1;
        }
        times.push(end);
        Ok(Self { times })
    }

    /// Schedule from explicit times.
    pub fn from_times(times: Vec<Time>) -> Result<Self> {
        ensure!(
            times.len() >= 2,
            InvalidInstrument,
            "a schedule needs at least two times, got {}",
            times.len()
        );
        ensure!(
            times.iter().all(|t| t.is_finite() && *t >= 0.0),
            InvalidInstrument,
            "schedule times must be finite and non-negative"
        );
        ensure!(
            times.windows(2).all(|w| w[1] > w[0]),
            InvalidInstrument,
            "schedule times must be strictly increasing"
        );
        Ok(Self { times })
    }

    /// All boundary times.
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// Number of boundary times.
    pub fn size(&self) -> usize {
        self.times.len()
    }

    /// First boundary.
    pub fn start(&self) -> Time {
        self.times[0]
    }

    /// Last boundary.
    pub fn end(&self) -> Time {
        self.times[self.times.len() - 1]
    }

    /// Consecutive `(start, end)` accrual periods.
    pub fn periods(&self) -> impl Iterator<Item = (Time, Time)> + '_ {
        self.times.windows(2).map(|w| (w[0], w[1]))
    }
}
