//! Option exercise schedules.
//!
//! An `Exercise` defines *when* an option can be exercised.

use serde::{Deserialize, Serialize};
use sr_core::{ensure, Result, Time};
use std::fmt;

/// Type of exercise right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    /// Exercisable only at expiry.
    European,
    /// Exercisable on a discrete set of times.
    Bermudan,
}

/// Exercise specification for an option.
#[derive(Debug, Clone, PartialEq)]
pub struct Exercise {
    exercise_type: ExerciseType,
    times: Vec<Time>,
}

impl Exercise {
    /// Exercise at `expiry` only.
    pub fn european(expiry: Time) -> Result<Self> {
        Self::new(ExerciseType::European, vec![expiry])
    }

    /// Exercise on each of `times`, which must be strictly increasing.
    pub fn bermudan(times: Vec<Time>) -> Result<Self> {
        Self::new(ExerciseType::Bermudan, times)
    }

    fn new(exercise_type: ExerciseType, times: Vec<Time>) -> Result<Self> {
        ensure!(!times.is_empty(), InvalidInstrument, "exercise schedule is empty");
        ensure!(
            times.iter().all(|t| t.is_finite() && *t >= 0.0),
            InvalidInstrument,
            "exercise times must be finite and non-negative, got {times:?}"
        );
        ensure!(
            times.windows(2).all(|w| w[1] > w[0]),
            InvalidInstrument,
            "exercise times must be strictly increasing, got {times:?}"
        );
        Ok(Self {
            exercise_type,
            times,
        })
    }

    /// The exercise type.
    pub fn exercise_type(&self) -> ExerciseType {
        self.exercise_type
    }

    /// All exercise times.
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// The last exercise time.
    pub fn last_time(&self) -> Time {
        self.times[self.times.len() - 1]
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exercise_type {
            ExerciseType::European => write!(f, "European({})", self.times[0]),
            ExerciseType::Bermudan => write!(f, "Bermudan({} dates)", self.times.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr_core::Error;

    #[test]
    fn european_exercise() {
        let ex = Exercise::european(2.0).unwrap();
        assert_eq!(ex.exercise_type(), ExerciseType::European);
        assert_eq!(ex.last_time(), 2.0);
        assert_eq!(ex.to_string(), "European(2)");
    }

    #[test]
    fn bermudan_exercise() {
        let ex = Exercise::bermudan(vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(ex.exercise_type(), ExerciseType::Bermudan);
        assert_eq!(ex.times().len(), 3);
        assert_eq!(ex.last_time(), 3.0);
        assert_eq!(ex.to_string(), "Bermudan(3 dates)");
    }

    #[test]
    fn malformed_schedules() {
        for times in [vec![], vec![1.0, 1.0], vec![2.0, 1.0], vec![-0.5, 1.0], vec![f64::NAN]] {
            assert!(matches!(Exercise::bermudan(times), Err(Error::InvalidInstrument(_))));
        }
    }
}
