use serde::{Deserialize, Serialize};

pub(crate) const MIN_STAT: f32 = 0.0;
pub(crate) const MAX_STAT: f32 = 100.0;

pub(crate) const SAVE_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum StatKind {
    Health,
    Happiness,
    Imagination,
}

impl StatKind {
    pub(crate) const ALL: [StatKind; 3] =
        [StatKind::Health, StatKind::Happiness, StatKind::Imagination];

    pub(crate) fn index(self) -> usize {
        match self {
            StatKind::Health => 0,
            StatKind::Happiness => 1,
            StatKind::Imagination => 2,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            StatKind::Health => "Health",
            StatKind::Happiness => "Happiness",
            StatKind::Imagination => "Imagination",
        }
    }

    pub(crate) fn icon(self) -> char {
        match self {
            StatKind::Health => '♥',
            StatKind::Happiness => '☺',
            StatKind::Imagination => '✦',
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) enum EndingKind {
    /// Two or more active stats bottomed out.
    Bad,
    /// Two or more active stats maxed out.
    Delulu,
}

impl EndingKind {
    pub(crate) fn title(self) -> &'static str {
        match self {
            EndingKind::Bad => "Bad Ending",
            EndingKind::Delulu => "Delulu Ending",
        }
    }
}

/// Host-side state. Only `Gameplay` lets the simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum GameMode {
    MainMenu,
    Gameplay,
    Paused,
    Help,
    Ending(EndingKind),
}

/// Which bound a stat froze at.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) enum Bound {
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct Stat {
    pub(crate) kind: StatKind,
    pub(crate) value: f32,
    pub(crate) decrease_rate: f32,
    pub(crate) frozen: bool,
    pub(crate) active: bool,
    pub(crate) activation_day: u32,
}

impl Stat {
    pub(crate) fn new(kind: StatKind, value: f32, decrease_rate: f32, activation_day: u32) -> Self {
        Self {
            kind,
            value: value.clamp(MIN_STAT, MAX_STAT),
            decrease_rate,
            frozen: false,
            active: activation_day <= 1,
            activation_day,
        }
    }

    /// Active and not frozen: the stat both decays and accepts input.
    pub(crate) fn is_live(&self) -> bool {
        self.active && !self.frozen
    }

    pub(crate) fn at_bound(&self) -> Option<Bound> {
        if self.value <= MIN_STAT {
            Some(Bound::Min)
        } else if self.value >= MAX_STAT {
            Some(Bound::Max)
        } else {
            None
        }
    }

    /// Latch the freeze flag if the value sits on a bound.
    /// Returns the bound only on the transition.
    pub(crate) fn check_freeze(&mut self) -> Option<Bound> {
        if self.frozen {
            return None;
        }
        let bound = self.at_bound()?;
        self.frozen = true;
        Some(bound)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct DayClock {
    pub(crate) day: u32,
    /// Seconds left in the current day.
    pub(crate) countdown: f32,
}

impl DayClock {
    pub(crate) fn new(first_day_length: f32) -> Self {
        Self {
            day: 1,
            countdown: first_day_length,
        }
    }

    /// Whole seconds shown on the HUD ("Next Day: 7s").
    pub(crate) fn seconds_left(&self) -> u32 {
        self.countdown.max(0.0).ceil() as u32
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct EndingLatch {
    pub(crate) bad: bool,
    pub(crate) delulu: bool,
}

impl EndingLatch {
    /// Returns true when `kind` was not latched before.
    pub(crate) fn latch(&mut self, kind: EndingKind) -> bool {
        let slot = match kind {
            EndingKind::Bad => &mut self.bad,
            EndingKind::Delulu => &mut self.delulu,
        };
        let fresh = !*slot;
        *slot = true;
        fresh
    }

    pub(crate) fn any(&self) -> bool {
        self.bad || self.delulu
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct NeedyState {
    pub(crate) stat: StatKind,
    pub(crate) remaining: f32,
}

/// Minimal serializable picture of a running session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct Snapshot {
    pub(crate) stats: [Stat; 3],
    pub(crate) clock: DayClock,
    pub(crate) endings: EndingLatch,
    #[serde(default)]
    pub(crate) needy: Option<NeedyState>,
    pub(crate) seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_freezes_once_at_either_bound() {
        let mut low = Stat::new(StatKind::Health, 0.0, 1.0, 1);
        assert_eq!(low.check_freeze(), Some(Bound::Min));
        assert!(low.frozen);
        assert_eq!(low.check_freeze(), None);

        let mut high = Stat::new(StatKind::Happiness, 100.0, 1.5, 1);
        assert_eq!(high.check_freeze(), Some(Bound::Max));

        let mut mid = Stat::new(StatKind::Imagination, 42.0, 2.0, 1);
        assert_eq!(mid.check_freeze(), None);
        assert!(!mid.frozen);
    }

    #[test]
    fn new_stat_clamps_and_gates_on_activation_day() {
        let s = Stat::new(StatKind::Imagination, 140.0, 2.0, 2);
        assert_eq!(s.value, MAX_STAT);
        assert!(!s.active);
        assert!(!s.is_live());

        let s = Stat::new(StatKind::Health, -3.0, 1.0, 1);
        assert_eq!(s.value, MIN_STAT);
        assert!(s.active);
    }

    #[test]
    fn ending_latch_reports_first_latch_only() {
        let mut latch = EndingLatch::default();
        assert!(!latch.any());
        assert!(latch.latch(EndingKind::Delulu));
        assert!(!latch.latch(EndingKind::Delulu));
        assert!(latch.delulu);
        assert!(!latch.bad);
        assert!(latch.latch(EndingKind::Bad));
    }

    #[test]
    fn countdown_rounds_up_for_display() {
        let mut clock = DayClock::new(10.0);
        assert_eq!(clock.seconds_left(), 10);
        clock.countdown = 6.2;
        assert_eq!(clock.seconds_left(), 7);
        clock.countdown = -0.5;
        assert_eq!(clock.seconds_left(), 0);
    }
}
