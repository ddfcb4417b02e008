use crate::model::{StatKind, MAX_STAT, MIN_STAT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub(crate) const BALANCE_VERSION: u32 = 1;

/// Day -> decay multiplier. Applied on top of each stat's own rate.
pub(crate) trait DecayPolicy {
    fn multiplier(&self, day: u32) -> f32;
}

impl<F> DecayPolicy for F
where
    F: Fn(u32) -> f32,
{
    fn multiplier(&self, day: u32) -> f32 {
        self(day)
    }
}

/// One entry of a stepped curve. A list of these rather than a map: internally
/// tagged enums cannot read integer map keys back from JSON.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct DecayStep {
    pub(crate) day: u32,
    pub(crate) multiplier: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum DecayCurve {
    Flat,
    /// Explicit per-day table, then `tail_base^day` floored at the last step.
    Stepped {
        steps: Vec<DecayStep>,
        tail_base: f32,
    },
    Exponential {
        base: f32,
    },
    /// `base^n` where n restarts every `period` days.
    ExponentialReset {
        base: f32,
        period: u32,
    },
}

impl Default for DecayCurve {
    fn default() -> Self {
        let steps = [(1, 1.0), (2, 1.0), (3, 1.0), (4, 1.0), (5, 3.0), (6, 10.0)]
            .into_iter()
            .map(|(day, multiplier)| DecayStep { day, multiplier })
            .collect();
        DecayCurve::Stepped {
            steps,
            tail_base: 1.2,
        }
    }
}

impl DecayPolicy for DecayCurve {
    fn multiplier(&self, day: u32) -> f32 {
        let day = day.max(1);
        match self {
            DecayCurve::Flat => 1.0,
            DecayCurve::Stepped { steps, tail_base } => {
                // Floor at the latest step at or below `day` so the curve never dips.
                let latest = steps
                    .iter()
                    .filter(|s| s.day <= day)
                    .max_by_key(|s| s.day);
                match latest {
                    Some(step) if step.day == day => step.multiplier,
                    Some(step) => tail_base.powi(day as i32).max(step.multiplier),
                    None => tail_base.powi(day as i32).max(1.0),
                }
            }
            DecayCurve::Exponential { base } => base.powi(day as i32),
            DecayCurve::ExponentialReset { base, period } => {
                let period = (*period).max(1);
                let n = ((day - 1) % period) + 1;
                base.powi(n as i32)
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct DayLengthTable {
    pub(crate) lengths: BTreeMap<u32, f32>,
    /// Used for every day past the table.
    pub(crate) tail: f32,
}

impl Default for DayLengthTable {
    fn default() -> Self {
        let mut lengths = BTreeMap::new();
        lengths.insert(1, 10.0);
        lengths.insert(2, 10.0);
        lengths.insert(3, 15.0);
        Self {
            lengths,
            tail: 15.0,
        }
    }
}

impl DayLengthTable {
    pub(crate) fn length(&self, day: u32) -> f32 {
        self.lengths.get(&day).copied().unwrap_or(self.tail)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct StatTuning {
    pub(crate) initial: f32,
    pub(crate) rate: f32,
    pub(crate) activation_day: u32,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct NeedyTuning {
    pub(crate) first_day: u32,
    pub(crate) every: u32,
    pub(crate) duration: f32,
    pub(crate) factor: f32,
}

impl Default for NeedyTuning {
    fn default() -> Self {
        Self {
            first_day: 3,
            every: 2,
            duration: 8.0,
            factor: 2.0,
        }
    }
}

impl NeedyTuning {
    pub(crate) fn qualifies(&self, day: u32) -> bool {
        day >= self.first_day && (day - self.first_day) % self.every.max(1) == 0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct Balance {
    pub(crate) version: u32,
    pub(crate) decay: DecayCurve,
    pub(crate) day_lengths: DayLengthTable,
    pub(crate) health: StatTuning,
    pub(crate) happiness: StatTuning,
    pub(crate) imagination: StatTuning,
    #[serde(default)]
    pub(crate) needy: Option<NeedyTuning>,
}

impl Default for Balance {
    fn default() -> Self {
        Self {
            version: BALANCE_VERSION,
            decay: DecayCurve::default(),
            day_lengths: DayLengthTable::default(),
            health: StatTuning {
                initial: 50.0,
                rate: 1.0,
                activation_day: 1,
            },
            happiness: StatTuning {
                initial: 50.0,
                rate: 1.5,
                activation_day: 3,
            },
            imagination: StatTuning {
                initial: 50.0,
                rate: 2.0,
                activation_day: 2,
            },
            needy: Some(NeedyTuning::default()),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum BalanceError {
    #[error("unsupported balance version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("{stat:?} decrease rate must be positive, got {rate}")]
    Rate { stat: StatKind, rate: f32 },
    #[error("{stat:?} initial value {value} is outside [0, 100]")]
    Initial { stat: StatKind, value: f32 },
    #[error("{stat:?} activation day must be at least 1")]
    ActivationDay { stat: StatKind },
    #[error("day length for day {day} must be positive, got {seconds}")]
    DayLength { day: u32, seconds: f32 },
    #[error("decay multiplier for day {day} must be positive, got {multiplier}")]
    Multiplier { day: u32, multiplier: f32 },
    #[error("needy event: {0}")]
    Needy(&'static str),
}

impl Balance {
    pub(crate) fn tuning(&self, kind: StatKind) -> &StatTuning {
        match kind {
            StatKind::Health => &self.health,
            StatKind::Happiness => &self.happiness,
            StatKind::Imagination => &self.imagination,
        }
    }

    pub(crate) fn multiplier(&self, day: u32) -> f32 {
        self.decay.multiplier(day)
    }

    pub(crate) fn day_length(&self, day: u32) -> f32 {
        self.day_lengths.length(day)
    }

    pub(crate) fn validate(&self) -> Result<(), BalanceError> {
        if self.version != BALANCE_VERSION {
            return Err(BalanceError::Version {
                found: self.version,
                expected: BALANCE_VERSION,
            });
        }

        for kind in StatKind::ALL {
            let t = self.tuning(kind);
            if t.rate <= 0.0 || !t.rate.is_finite() {
                return Err(BalanceError::Rate {
                    stat: kind,
                    rate: t.rate,
                });
            }
            if !(MIN_STAT..=MAX_STAT).contains(&t.initial) {
                return Err(BalanceError::Initial {
                    stat: kind,
                    value: t.initial,
                });
            }
            if t.activation_day == 0 {
                return Err(BalanceError::ActivationDay { stat: kind });
            }
        }

        let tail_day = self
            .day_lengths
            .lengths
            .keys()
            .next_back()
            .map(|d| d + 1)
            .unwrap_or(1);
        for (day, seconds) in self
            .day_lengths
            .lengths
            .iter()
            .map(|(d, s)| (*d, *s))
            .chain(std::iter::once((tail_day, self.day_lengths.tail)))
        {
            if seconds <= 0.0 || !seconds.is_finite() {
                return Err(BalanceError::DayLength { day, seconds });
            }
        }

        // Table-driven curves only need checking over the table plus one tail day.
        let probe_until = match &self.decay {
            DecayCurve::Stepped { steps, .. } => {
                steps.iter().map(|s| s.day).max().unwrap_or(1) + 1
            }
            DecayCurve::ExponentialReset { period, .. } => (*period).max(1),
            _ => 1,
        };
        for day in 1..=probe_until {
            let multiplier = self.multiplier(day);
            if multiplier <= 0.0 || !multiplier.is_finite() {
                return Err(BalanceError::Multiplier { day, multiplier });
            }
        }

        if let Some(needy) = &self.needy {
            if needy.every == 0 {
                return Err(BalanceError::Needy("period must be at least 1 day"));
            }
            if needy.duration <= 0.0 || !needy.duration.is_finite() {
                return Err(BalanceError::Needy("duration must be positive"));
            }
            if needy.factor <= 0.0 || !needy.factor.is_finite() {
                return Err(BalanceError::Needy("factor must be positive"));
            }
        }

        Ok(())
    }
}
