use crate::balance::{Balance, DecayPolicy};
use crate::events::{EventSink, SimEvent};
use crate::input::InputSource;
use crate::model::{
    DayClock, EndingKind, EndingLatch, NeedyState, Snapshot, Stat, StatKind, MAX_STAT, MIN_STAT,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Bob's three stats, the day clock and the ending latches.
///
/// Driven by the host: one `tick` per frame while gameplay is active, plus
/// `try_increment` / `apply_input` for player taps. Every outcome is reported
/// through the injected [`EventSink`]; nothing here fails.
///
/// The decay curve comes from the balance unless another [`DecayPolicy`] is
/// plugged in with [`StatSimulation::with_policy`].
pub(crate) struct StatSimulation<S: EventSink> {
    balance: Balance,
    policy: Box<dyn DecayPolicy>,
    stats: [Stat; 3],
    clock: DayClock,
    endings: EndingLatch,
    needy: Option<NeedyState>,
    running: bool,
    seed: u64,
    rng: StdRng,
    sink: S,
}

impl<S: EventSink> StatSimulation<S> {
    pub(crate) fn new(balance: Balance, seed: u64, sink: S) -> Self {
        let policy = Box::new(balance.decay.clone());
        Self::with_policy(balance, policy, seed, sink)
    }

    pub(crate) fn with_policy(
        balance: Balance,
        policy: Box<dyn DecayPolicy>,
        seed: u64,
        sink: S,
    ) -> Self {
        let stats = fresh_stats(&balance);
        let clock = DayClock::new(balance.day_length(1));
        Self {
            balance,
            policy,
            stats,
            clock,
            endings: EndingLatch::default(),
            needy: None,
            running: true,
            seed,
            rng: StdRng::seed_from_u64(seed),
            sink,
        }
    }

    /// Back to day 1 with fresh stats. Keeps balance, seed and sink.
    pub(crate) fn restart(&mut self) {
        self.stats = fresh_stats(&self.balance);
        self.clock = DayClock::new(self.balance.day_length(1));
        self.endings = EndingLatch::default();
        self.needy = None;
        self.running = true;
        self.rng = StdRng::seed_from_u64(self.seed);
        info!("simulation restarted");
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        if self.running != running {
            debug!(running, "simulation gate changed");
        }
        self.running = running;
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running
    }

    pub(crate) fn tick(&mut self, dt: f32) {
        if !self.running || dt <= 0.0 || !dt.is_finite() {
            return;
        }

        let multiplier = self.decay_multiplier();
        for i in 0..self.stats.len() {
            let needy_factor = self.needy_factor(self.stats[i].kind);
            let stat = &mut self.stats[i];
            if !stat.is_live() {
                continue;
            }
            let loss = multiplier * stat.decrease_rate * needy_factor * dt;
            stat.value = (stat.value - loss).max(MIN_STAT);
        }
        self.freeze_pass();

        self.clock.countdown -= dt;
        if self.clock.countdown <= 0.0 {
            self.advance_day();
        }

        self.update_needy(dt);
        self.evaluate_endings();
    }

    /// Player top-up. Fails on inactive, frozen or maxed stats, and on
    /// amounts that are not positive and finite.
    pub(crate) fn try_increment(&mut self, kind: StatKind, amount: f32) -> bool {
        if amount <= 0.0 || !amount.is_finite() {
            return false;
        }
        let stat = &mut self.stats[kind.index()];
        if !stat.is_live() || stat.value >= MAX_STAT {
            return false;
        }
        stat.value = (stat.value + amount).clamp(MIN_STAT, MAX_STAT);
        let value = stat.value;
        self.freeze_pass();
        self.sink.emit(SimEvent::StatIncremented { stat: kind, value });
        true
    }

    /// Consume one directional tap, if any, and feed the matching stat.
    pub(crate) fn apply_input<I: InputSource>(&mut self, input: &mut I) -> bool {
        let Some(dir) = input.take_direction() else {
            return false;
        };
        if !self.running {
            return false;
        }
        match dir.stat() {
            Some(kind) => self.try_increment(kind, 1.0),
            None => false,
        }
    }

    pub(crate) fn decay_multiplier(&self) -> f32 {
        self.policy.multiplier(self.clock.day)
    }

    pub(crate) fn day_length(&self) -> f32 {
        self.balance.day_length(self.clock.day)
    }

    pub(crate) fn day(&self) -> u32 {
        self.clock.day
    }

    pub(crate) fn clock(&self) -> &DayClock {
        &self.clock
    }

    pub(crate) fn stat(&self, kind: StatKind) -> &Stat {
        &self.stats[kind.index()]
    }

    pub(crate) fn value(&self, kind: StatKind) -> f32 {
        self.stat(kind).value
    }

    pub(crate) fn endings(&self) -> &EndingLatch {
        &self.endings
    }

    pub(crate) fn needy(&self) -> Option<&NeedyState> {
        self.needy.as_ref()
    }

    pub(crate) fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            stats: self.stats,
            clock: self.clock,
            endings: self.endings,
            needy: self.needy,
            seed: self.seed,
        }
    }

    /// Resume from a snapshot. Decrease rates come from the current balance.
    pub(crate) fn restore(&mut self, snap: &Snapshot) {
        for saved in snap.stats {
            let tuning = self.balance.tuning(saved.kind);
            let stat = &mut self.stats[saved.kind.index()];
            stat.value = saved.value.clamp(MIN_STAT, MAX_STAT);
            stat.frozen = saved.frozen;
            stat.active = saved.active;
            stat.decrease_rate = tuning.rate;
            stat.activation_day = tuning.activation_day;
        }
        self.clock = DayClock {
            day: snap.clock.day.max(1),
            countdown: snap.clock.countdown.max(0.0),
        };
        self.endings = snap.endings;
        self.needy = snap.needy;
        self.seed = snap.seed;
        // Reseed per day so a resumed run does not replay day 1's rolls.
        self.rng = StdRng::seed_from_u64(snap.seed ^ u64::from(self.clock.day));
        info!(day = self.clock.day, "simulation restored");
    }

    #[cfg(test)]
    pub(crate) fn set_value(&mut self, kind: StatKind, value: f32) {
        self.stats[kind.index()].value = value.clamp(MIN_STAT, MAX_STAT);
        self.freeze_pass();
    }

    fn needy_factor(&self, kind: StatKind) -> f32 {
        match (&self.needy, &self.balance.needy) {
            (Some(state), Some(tuning)) if state.stat == kind => tuning.factor,
            _ => 1.0,
        }
    }

    fn freeze_pass(&mut self) {
        for stat in &mut self.stats {
            if !stat.active {
                continue;
            }
            if let Some(at) = stat.check_freeze() {
                debug!(stat = ?stat.kind, ?at, "stat frozen");
                self.sink.emit(SimEvent::StatFrozen {
                    stat: stat.kind,
                    at,
                });
            }
        }
    }

    fn advance_day(&mut self) {
        self.clock.day += 1;
        self.clock.countdown = self.balance.day_length(self.clock.day);
        let day = self.clock.day;

        for stat in &mut self.stats {
            if !stat.active && stat.activation_day <= day {
                stat.active = true;
                debug!(stat = ?stat.kind, day, "stat activated");
                self.sink.emit(SimEvent::StatActivated { stat: stat.kind });
            }
        }
        // A stat can unlock already sitting on a bound.
        self.freeze_pass();

        info!(day, multiplier = self.decay_multiplier(), "day advanced");
        self.sink.emit(SimEvent::DayAdvanced { day });
    }

    fn update_needy(&mut self, dt: f32) {
        let Some(tuning) = self.balance.needy else {
            return;
        };

        if let Some(state) = &mut self.needy {
            state.remaining -= dt;
            if state.remaining > 0.0 {
                return;
            }
            let stat = state.stat;
            self.needy = None;
            debug!(?stat, "needy event over");
            self.sink.emit(SimEvent::NeedyEnded { stat });
        }

        if tuning.qualifies(self.clock.day) {
            let stat = StatKind::ALL[self.rng.gen_range(0..StatKind::ALL.len())];
            self.needy = Some(NeedyState {
                stat,
                remaining: tuning.duration,
            });
            info!(?stat, day = self.clock.day, "bob is needy");
            self.sink.emit(SimEvent::NeedyStarted { stat });
        }
    }

    fn evaluate_endings(&mut self) {
        let (mut at_min, mut at_max) = (0, 0);
        for stat in self.stats.iter().filter(|s| s.active) {
            if stat.value <= MIN_STAT {
                at_min += 1;
            }
            if stat.value >= MAX_STAT {
                at_max += 1;
            }
        }

        if at_max >= 2 && self.endings.latch(EndingKind::Delulu) {
            info!(day = self.clock.day, "delulu ending");
            self.sink.emit(SimEvent::EndingTriggered {
                kind: EndingKind::Delulu,
            });
        }
        if at_min >= 2 && self.endings.latch(EndingKind::Bad) {
            info!(day = self.clock.day, "bad ending");
            self.sink.emit(SimEvent::EndingTriggered {
                kind: EndingKind::Bad,
            });
        }
    }
}

fn fresh_stats(balance: &Balance) -> [Stat; 3] {
    StatKind::ALL.map(|kind| {
        let t = balance.tuning(kind);
        Stat::new(kind, t.initial, t.rate, t.activation_day)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::{DecayCurve, NeedyTuning};
    use crate::input::{Direction, TapInput};
    use crate::model::Bound;

    fn quiet_balance() -> Balance {
        Balance {
            needy: None,
            ..Balance::default()
        }
    }

    fn all_active() -> Balance {
        let mut b = quiet_balance();
        b.happiness.activation_day = 1;
        b.imagination.activation_day = 1;
        b
    }

    fn sim(balance: Balance) -> StatSimulation<Vec<SimEvent>> {
        StatSimulation::new(balance, 7, Vec::new())
    }

    fn drain(sim: &mut StatSimulation<Vec<SimEvent>>) -> Vec<SimEvent> {
        std::mem::take(sim.sink_mut())
    }

    #[test]
    fn starts_on_day_one_with_two_stats_locked() {
        let s = sim(Balance::default());
        assert_eq!(s.day(), 1);
        assert_eq!(s.clock().countdown, 10.0);
        assert!(s.is_running());
        for kind in StatKind::ALL {
            assert_eq!(s.value(kind), 50.0);
        }
        assert!(s.stat(StatKind::Health).active);
        assert!(!s.stat(StatKind::Happiness).active);
        assert!(!s.stat(StatKind::Imagination).active);
    }

    #[test]
    fn first_day_rollover() {
        let mut s = sim(quiet_balance());
        s.tick(10.0);

        assert_eq!(s.day(), 2);
        assert_eq!(s.clock().countdown, s.day_length());
        assert_eq!(s.clock().countdown, 10.0);
        assert!(s.stat(StatKind::Imagination).active);
        assert!(!s.stat(StatKind::Happiness).active);
        assert!((s.value(StatKind::Health) - 40.0).abs() < 1e-4);
        // Locked stats do not decay.
        assert_eq!(s.value(StatKind::Happiness), 50.0);
        assert_eq!(s.value(StatKind::Imagination), 50.0);

        let events = drain(&mut s);
        assert_eq!(
            events,
            vec![
                SimEvent::StatActivated {
                    stat: StatKind::Imagination
                },
                SimEvent::DayAdvanced { day: 2 },
            ]
        );
    }

    #[test]
    fn day_advances_once_per_day_length() {
        let mut s = sim(quiet_balance());
        let mut days = vec![s.day()];
        // 0.25s steps are exact in binary, so no drift.
        for _ in 0..(4 * 35) {
            s.tick(0.25);
            days.push(s.day());
        }
        // 10 + 10 + 15 = 35 seconds covers three full days.
        assert_eq!(s.day(), 4);
        assert!(days.windows(2).all(|w| w[1] >= w[0] && w[1] - w[0] <= 1));
        let advanced = drain(&mut s)
            .into_iter()
            .filter(|e| matches!(e, SimEvent::DayAdvanced { .. }))
            .count();
        assert_eq!(advanced, 3);
    }

    #[test]
    fn paused_simulation_ignores_ticks_and_taps() {
        let mut s = sim(quiet_balance());
        s.set_running(false);
        s.tick(5.0);
        assert_eq!(s.value(StatKind::Health), 50.0);
        assert_eq!(s.clock().countdown, 10.0);

        let mut tap = TapInput::default();
        tap.press(Direction::Up);
        assert!(!s.apply_input(&mut tap));
        assert_eq!(s.value(StatKind::Health), 50.0);

        s.set_running(true);
        s.tick(5.0);
        assert!((s.value(StatKind::Health) - 45.0).abs() < 1e-4);
    }

    #[test]
    fn bad_dt_is_ignored() {
        let mut s = sim(quiet_balance());
        s.tick(0.0);
        s.tick(-3.0);
        s.tick(f32::NAN);
        s.tick(f32::INFINITY);
        assert_eq!(s.value(StatKind::Health), 50.0);
        assert_eq!(s.day(), 1);
    }

    #[test]
    fn health_freezes_at_zero_once() {
        let mut s = sim(quiet_balance());
        for _ in 0..200 {
            s.tick(0.5);
        }
        assert_eq!(s.value(StatKind::Health), 0.0);
        assert!(s.stat(StatKind::Health).frozen);

        let frozen: Vec<_> = drain(&mut s)
            .into_iter()
            .filter(|e| {
                matches!(
                    e,
                    SimEvent::StatFrozen {
                        stat: StatKind::Health,
                        ..
                    }
                )
            })
            .collect();
        assert_eq!(
            frozen,
            vec![SimEvent::StatFrozen {
                stat: StatKind::Health,
                at: Bound::Min
            }]
        );

        for _ in 0..50 {
            s.tick(1.0);
        }
        assert_eq!(s.value(StatKind::Health), 0.0);
        assert!(!s.try_increment(StatKind::Health, 1.0));
        assert_eq!(s.value(StatKind::Health), 0.0);
    }

    #[test]
    fn values_stay_in_range() {
        let mut s = sim(Balance::default());
        let mut tap = TapInput::default();
        let dirs = [Direction::Up, Direction::Left, Direction::Right, Direction::Down];
        for i in 0..2000 {
            tap.press(dirs[i % dirs.len()]);
            s.apply_input(&mut tap);
            s.tick(0.1);
            for kind in StatKind::ALL {
                let v = s.value(kind);
                assert!((0.0..=100.0).contains(&v), "{kind:?} out of range: {v}");
            }
        }
    }

    #[test]
    fn increments_respect_activation_and_freeze() {
        let mut s = sim(quiet_balance());
        assert!(!s.try_increment(StatKind::Happiness, 1.0));
        assert!(!s.try_increment(StatKind::Imagination, 1.0));
        assert_eq!(s.value(StatKind::Happiness), 50.0);
        assert!(drain(&mut s).is_empty());

        assert!(s.try_increment(StatKind::Health, 1.0));
        assert_eq!(s.value(StatKind::Health), 51.0);
        assert_eq!(
            drain(&mut s),
            vec![SimEvent::StatIncremented {
                stat: StatKind::Health,
                value: 51.0
            }]
        );

        // Climbing to the cap freezes on the way in.
        assert!(s.try_increment(StatKind::Health, 60.0));
        assert_eq!(s.value(StatKind::Health), 100.0);
        assert!(s.stat(StatKind::Health).frozen);
        assert!(!s.try_increment(StatKind::Health, 1.0));

        s.tick(3.0);
        assert_eq!(s.value(StatKind::Health), 100.0);
    }

    #[test]
    fn arrow_taps_feed_mapped_stats() {
        let mut s = sim(all_active());
        let mut tap = TapInput::default();

        tap.press(Direction::Up);
        assert!(s.apply_input(&mut tap));
        tap.press(Direction::Right);
        assert!(s.apply_input(&mut tap));
        tap.press(Direction::Left);
        assert!(s.apply_input(&mut tap));
        tap.press(Direction::Down);
        assert!(!s.apply_input(&mut tap));
        assert!(!s.apply_input(&mut tap));

        for kind in StatKind::ALL {
            assert_eq!(s.value(kind), 51.0);
        }
    }

    #[test]
    fn delulu_ending_fires_once() {
        let mut s = sim(all_active());
        s.set_value(StatKind::Happiness, 100.0);
        s.tick(0.1);
        assert!(!s.endings().delulu);

        assert!(s.try_increment(StatKind::Imagination, 60.0));
        assert_eq!(s.value(StatKind::Imagination), 100.0);
        drain(&mut s);

        s.tick(0.1);
        assert_eq!(
            drain(&mut s),
            vec![SimEvent::EndingTriggered {
                kind: EndingKind::Delulu
            }]
        );

        for _ in 0..100 {
            s.tick(0.5);
        }
        let again = drain(&mut s)
            .into_iter()
            .any(|e| matches!(e, SimEvent::EndingTriggered { kind: EndingKind::Delulu }));
        assert!(!again);
        assert!(s.endings().delulu);
    }

    #[test]
    fn inactive_stats_do_not_count_toward_endings() {
        let mut s = sim(quiet_balance());
        // Only health is active; parking it at zero is one stat, not two.
        s.set_value(StatKind::Health, 0.0);
        s.tick(0.1);
        assert!(!s.endings().bad);
    }

    #[test]
    fn bad_ending_on_full_neglect() {
        let mut s = sim(quiet_balance());
        let mut saw = 0;
        for _ in 0..400 {
            s.tick(0.25);
            saw += drain(&mut s)
                .iter()
                .filter(|e| matches!(e, SimEvent::EndingTriggered { kind: EndingKind::Bad }))
                .count();
        }
        assert_eq!(saw, 1);
        assert!(s.endings().bad);
        assert!(!s.endings().delulu);
    }

    #[test]
    fn multiplier_scales_decay() {
        let mut b = quiet_balance();
        b.decay = DecayCurve::Exponential { base: 2.0 };
        let mut s = sim(b);
        assert_eq!(s.decay_multiplier(), 2.0);
        s.tick(1.0);
        assert!((s.value(StatKind::Health) - 48.0).abs() < 1e-4);
    }

    #[test]
    fn plugged_in_policy_drives_decay() {
        let mut s = StatSimulation::with_policy(
            quiet_balance(),
            Box::new(|day: u32| day as f32 * 3.0),
            7,
            Vec::new(),
        );
        assert_eq!(s.decay_multiplier(), 3.0);
        s.tick(1.0);
        assert!((s.value(StatKind::Health) - 47.0).abs() < 1e-4);

        s.tick(9.0);
        assert_eq!(s.day(), 2);
        assert_eq!(s.decay_multiplier(), 6.0);
        let before = s.value(StatKind::Health);
        s.tick(0.5);
        assert!((before - s.value(StatKind::Health) - 3.0).abs() < 1e-4);
    }

    #[test]
    fn nonsense_increments_are_rejected() {
        let mut s = sim(quiet_balance());
        assert!(!s.try_increment(StatKind::Health, f32::NAN));
        assert!(!s.try_increment(StatKind::Health, f32::INFINITY));
        assert!(!s.try_increment(StatKind::Health, -5.0));
        assert!(!s.try_increment(StatKind::Health, 0.0));
        assert_eq!(s.value(StatKind::Health), 50.0);
        assert!(drain(&mut s).is_empty());
    }

    #[test]
    fn needy_event_doubles_one_stat() {
        let mut b = all_active();
        b.needy = Some(NeedyTuning {
            first_day: 1,
            every: 1,
            duration: 2.0,
            factor: 2.0,
        });
        let mut s = sim(b);
        s.tick(0.5);
        let stat = match drain(&mut s).as_slice() {
            [SimEvent::NeedyStarted { stat }] => *stat,
            other => panic!("unexpected events: {other:?}"),
        };
        assert_eq!(s.needy().map(|n| n.stat), Some(stat));

        let before = s.value(stat);
        let rate = s.stat(stat).decrease_rate;
        s.tick(1.0);
        assert!((before - s.value(stat) - 2.0 * rate).abs() < 1e-4);

        s.tick(1.0);
        let events = drain(&mut s);
        assert!(events.contains(&SimEvent::NeedyEnded { stat }));
        // Day still qualifies, so the next one starts right away.
        assert!(events
            .iter()
            .any(|e| matches!(e, SimEvent::NeedyStarted { .. })));
    }

    #[test]
    fn needy_waits_for_its_day() {
        let mut s = sim(Balance::default());
        s.tick(5.0);
        assert!(s.needy().is_none());
        s.tick(5.0);
        s.tick(10.0);
        assert_eq!(s.day(), 3);
        assert!(s.needy().is_some());
    }

    #[test]
    fn snapshot_restore_resumes_state() {
        let mut s = sim(Balance::default());
        s.tick(10.0);
        s.tick(4.0);
        s.try_increment(StatKind::Imagination, 3.0);
        let snap = s.snapshot();

        let mut other = sim(Balance::default());
        other.restore(&snap);
        assert_eq!(other.snapshot(), snap);
        assert_eq!(other.day(), 2);
        assert!(other.stat(StatKind::Imagination).active);

        s.tick(1.0);
        other.tick(1.0);
        for kind in StatKind::ALL {
            assert_eq!(s.value(kind), other.value(kind));
        }
    }

    #[test]
    fn restart_resets_everything() {
        let mut s = sim(all_active());
        s.set_value(StatKind::Health, 0.0);
        s.set_value(StatKind::Happiness, 0.0);
        s.tick(12.0);
        s.set_running(false);
        assert!(s.endings().bad);

        s.restart();
        assert!(s.is_running());
        assert_eq!(s.day(), 1);
        assert!(!s.endings().any());
        assert!(!s.stat(StatKind::Health).frozen);
        assert_eq!(s.value(StatKind::Health), 50.0);
    }
}
