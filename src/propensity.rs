//! Propensity-reporting strategies.
//!
//! The propensity attached to a feedback label is what the learner divides by
//! when it importance-weights the observed cost. Reporting something other than
//! the learner's own estimate (a floor, a constant, the uniform rate) is a way
//! to study how sensitive a learner is to mis-specified or clipped propensities.

use crate::SimError;

/// How the reported propensity is derived from the learner's estimate.
///
/// Each variant has a stable numeric id used on the command line and in
/// report rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropensityStrategy {
    /// Id 0: report the learner's estimate unchanged.
    #[default]
    Identity,
    /// Id 1: report `1 / num_actions`.
    Uniform,
    /// Id 2: report `max(raw, 0.5)`.
    ClipLowHalf,
    /// Id 6: report `max(raw, 0.9)`.
    ClipLowNinety,
    /// Id 7: always report `0.9`.
    FixedNinety,
    /// Id 13: always report `0.5`.
    FixedHalf,
    /// Id 14: report `max(raw, 0.1)`.
    ClipLowTenth,
}

impl PropensityStrategy {
    /// Every recognized strategy, in id order.
    pub const ALL: [PropensityStrategy; 7] = [
        Self::Identity,
        Self::Uniform,
        Self::ClipLowHalf,
        Self::ClipLowNinety,
        Self::FixedNinety,
        Self::FixedHalf,
        Self::ClipLowTenth,
    ];

    /// Resolve a numeric strategy id.
    ///
    /// Unrecognized ids fail with [`SimError::UnknownStrategy`]; there is no
    /// fallback to `Identity`.
    pub fn from_id(id: i64) -> Result<Self, SimError> {
        match id {
            0 => Ok(Self::Identity),
            1 => Ok(Self::Uniform),
            2 => Ok(Self::ClipLowHalf),
            6 => Ok(Self::ClipLowNinety),
            7 => Ok(Self::FixedNinety),
            13 => Ok(Self::FixedHalf),
            14 => Ok(Self::ClipLowTenth),
            other => Err(SimError::UnknownStrategy(other)),
        }
    }

    /// Stable numeric id.
    pub fn id(self) -> i64 {
        match self {
            Self::Identity => 0,
            Self::Uniform => 1,
            Self::ClipLowHalf => 2,
            Self::ClipLowNinety => 6,
            Self::FixedNinety => 7,
            Self::FixedHalf => 13,
            Self::ClipLowTenth => 14,
        }
    }

    /// Map the learner's normalized probability for the chosen action to the
    /// propensity recorded in the label.
    ///
    /// `num_actions` must be >= 1 (guaranteed by configuration validation).
    #[must_use]
    pub fn report(self, raw_propensity: f64, num_actions: usize) -> f64 {
        match self {
            Self::Identity => raw_propensity,
            Self::Uniform => 1.0 / num_actions.max(1) as f64,
            Self::ClipLowHalf => raw_propensity.max(0.5),
            Self::ClipLowNinety => raw_propensity.max(0.9),
            Self::FixedNinety => 0.9,
            Self::FixedHalf => 0.5,
            Self::ClipLowTenth => raw_propensity.max(0.1),
        }
    }
}

impl TryFrom<i64> for PropensityStrategy {
    type Error = SimError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::from_id(id)
    }
}

impl std::fmt::Display for PropensityStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ids_round_trip_for_every_strategy() {
        for s in PropensityStrategy::ALL {
            assert_eq!(PropensityStrategy::from_id(s.id()).unwrap(), s);
        }
    }

    #[test]
    fn try_from_matches_from_id() {
        assert_eq!(PropensityStrategy::try_from(14), Ok(PropensityStrategy::ClipLowTenth));
        let err: Result<PropensityStrategy, _> = 42i64.try_into();
        assert_eq!(err, Err(SimError::UnknownStrategy(42)));
    }

    #[test]
    fn unrecognized_ids_fail_loudly() {
        for id in [3, 4, 5, 8, 12, 15, 99, -1] {
            assert_eq!(
                PropensityStrategy::from_id(id),
                Err(SimError::UnknownStrategy(id))
            );
        }
    }

    #[test]
    fn clip_strategies_raise_small_values_only() {
        assert_eq!(PropensityStrategy::ClipLowHalf.report(0.2, 4), 0.5);
        assert_eq!(PropensityStrategy::ClipLowHalf.report(0.7, 4), 0.7);
        assert_eq!(PropensityStrategy::ClipLowNinety.report(0.3, 4), 0.9);
        assert_eq!(PropensityStrategy::ClipLowNinety.report(0.95, 4), 0.95);
        assert_eq!(PropensityStrategy::ClipLowTenth.report(0.01, 4), 0.1);
        assert_eq!(PropensityStrategy::ClipLowTenth.report(0.25, 4), 0.25);
        assert_eq!(PropensityStrategy::Identity.report(0.01, 4), 0.01);
    }

    #[test]
    fn displays_numeric_id() {
        assert_eq!(PropensityStrategy::FixedHalf.to_string(), "13");
        assert_eq!(PropensityStrategy::default().to_string(), "0");
    }

    proptest! {
        #[test]
        fn fixed_strategies_ignore_raw_propensity(
            x in 0.0f64..=1.0,
            n in 1usize..64,
        ) {
            prop_assert_eq!(PropensityStrategy::Uniform.report(x, n), 1.0 / n as f64);
            prop_assert_eq!(PropensityStrategy::FixedNinety.report(x, n), 0.9);
            prop_assert_eq!(PropensityStrategy::FixedHalf.report(x, n), 0.5);
        }

        #[test]
        fn report_is_pure_and_stays_in_unit_interval(
            x in 1e-9f64..=1.0,
            n in 1usize..64,
        ) {
            for s in PropensityStrategy::ALL {
                let a = s.report(x, n);
                let b = s.report(x, n);
                prop_assert_eq!(a, b);
                prop_assert!(a > 0.0 && a <= 1.0, "strategy={:?} x={} -> {}", s, x, a);
            }
        }
    }
}
