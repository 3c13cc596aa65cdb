//! Round engine
//!
//! Owns the round lifecycle:
//!
//! ```text
//! Idle ──ignite──────────────► Active ──tick, discount >= crash──► Crashed ──┐
//!   ▲                            ▲  └────cash_out───────────────► CashedOut ─┤
//!   │                            │                                           │
//! Countdown ──ignite / timeout───┘            re-arm after delay ◄───────────┘
//! ```
//!
//! Time is injected: every entry point takes `now_ms`, and scheduled work
//! only runs inside [`RoundEngine::advance`]. Commands apply immediately,
//! so they always land before the next scheduled tick.

use rand::Rng;
use rand_pcg::Pcg32;

use super::crash_table::CrashTable;
use super::growth::{discount_at, time_to_reach};
use super::schedule::{Scheduler, TaskId, TaskKind};
use super::state::{EngineEvent, EnginePhase, Round, RoundStatus, RngState, Session, Snapshot};
use crate::config::{CrashFreeze, EngineConfig, ResetPolicy, RestartPolicy};
use crate::consts::{COUNTDOWN_STEP_MS, CRASH_EPSILON};
use crate::error::ConfigError;
use crate::history::{Outcome, RoundRecord};
use crate::observer::Observer;

pub struct RoundEngine {
    config: EngineConfig,
    rng_state: RngState,
    rng: Pcg32,
    phase: EnginePhase,
    /// Current round, or the last finished one
    round: Option<Round>,
    session: Session,
    scheduler: Scheduler,
    /// Growth ticker, only while Active
    ticker: Option<TaskId>,
    /// Countdown or re-arm timer, never while Active
    timer: Option<TaskId>,
    countdown_remaining: Option<u32>,
    observers: Vec<Box<dyn Observer>>,
}

impl RoundEngine {
    /// Build an idle engine. Fails if the configuration is unusable.
    pub fn new(config: EngineConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng_state = RngState::new(seed);
        let rng = rng_state.to_rng();
        Ok(Self {
            config,
            rng_state,
            rng,
            phase: EnginePhase::Idle,
            round: None,
            session: Session::default(),
            scheduler: Scheduler::new(),
            ticker: None,
            timer: None,
            countdown_remaining: None,
            observers: Vec::new(),
        })
    }

    pub fn subscribe(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    /// Arm the first round: opens the countdown when the config has one.
    /// Returns false if the engine is already past idle.
    pub fn start(&mut self, now_ms: f64) -> bool {
        if self.phase != EnginePhase::Idle || self.round.is_some() {
            return false;
        }
        if self.config.has_countdown() {
            self.open_countdown(now_ms);
        }
        true
    }

    // === Commands ===

    /// Start (or join) a round. Rejected unless idle or counting down.
    pub fn ignite(&mut self, now_ms: f64) -> bool {
        match self.phase {
            EnginePhase::Idle | EnginePhase::Countdown => {
                self.launch(now_ms, true);
                true
            }
            phase => {
                log::debug!("Ignite rejected during {:?}", phase);
                false
            }
        }
    }

    /// Lock in the current discount. Rejected unless a joined round is in
    /// flight.
    ///
    /// The discount is evaluated at `now_ms`; if that already reaches the
    /// crash point the round crashes instead and the command is rejected.
    pub fn cash_out(&mut self, now_ms: f64) -> bool {
        if self.phase != EnginePhase::Active || !self.session.player_joined {
            log::debug!(
                "Cash-out rejected during {:?} (joined: {})",
                self.phase,
                self.session.player_joined
            );
            return false;
        }
        if self.update_discount(now_ms) {
            self.crash(now_ms);
            return false;
        }

        let Some(round) = self.round.as_mut() else {
            return false;
        };
        round.status = RoundStatus::CashedOut;
        let discount = round.discount;
        let record = RoundRecord {
            number: round.number,
            outcome: Outcome::CashedOut,
            discount,
            crash_point: round.crash_point(),
            joined: round.joined,
        };
        let number = round.number;

        self.session.accumulated_discount += discount;
        self.session.history.push(record);
        self.finish(EnginePhase::CashedOut, now_ms);
        self.emit(EngineEvent::CashedOut {
            round: number,
            discount,
            accumulated: self.session.accumulated_discount,
        });
        true
    }

    /// Run every scheduled task due at or before `now_ms`
    pub fn advance(&mut self, now_ms: f64) {
        while let Some(fired) = self.scheduler.pop_due(now_ms) {
            if Some(fired.id) != self.ticker && Some(fired.id) != self.timer {
                log::debug!("Dropping stale {:?} task", fired.kind);
                continue;
            }
            match fired.kind {
                TaskKind::GrowthTick => self.on_tick(now_ms),
                TaskKind::CountdownStep => self.on_countdown_step(fired.due_ms),
                TaskKind::Rearm => self.on_rearm(fired.due_ms),
            }
        }
    }

    // === Queries ===

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The configured distribution, for display
    pub fn crash_table(&self) -> &CrashTable {
        &self.config.crash_table
    }

    pub fn seed(&self) -> u64 {
        self.rng_state.seed
    }

    pub fn accumulated_discount(&self) -> f64 {
        self.session.accumulated_discount
    }

    pub fn can_ignite(&self) -> bool {
        matches!(self.phase, EnginePhase::Idle | EnginePhase::Countdown)
    }

    pub fn can_cash_out(&self) -> bool {
        self.phase == EnginePhase::Active && self.session.player_joined
    }

    /// Pending scheduled tasks of a kind
    pub fn pending(&self, kind: TaskKind) -> usize {
        self.scheduler.count(kind)
    }

    /// When `advance` next has work to do
    pub fn next_due(&self) -> Option<f64> {
        self.scheduler.next_due()
    }

    pub fn snapshot(&self) -> Snapshot {
        let in_round = matches!(
            self.phase,
            EnginePhase::Active | EnginePhase::Crashed | EnginePhase::CashedOut
        );
        let round = self.round.as_ref().filter(|_| in_round);
        Snapshot {
            phase: self.phase,
            status: round.map_or(RoundStatus::Pending, |r| r.status),
            discount: round.map_or(self.config.start_discount, |r| r.discount),
            crashed: self.phase == EnginePhase::Crashed,
            accumulated_discount: self.session.accumulated_discount,
            player_joined: self.session.player_joined,
            countdown_remaining: self.countdown_remaining,
            round_number: self.session.rounds_played,
            crash_point: round.and_then(|r| r.revealed_crash_point()),
            can_ignite: self.can_ignite(),
            can_cash_out: self.can_cash_out(),
        }
    }

    // === Transitions ===

    fn launch(&mut self, now_ms: f64, joined: bool) {
        self.cancel_ticker();
        self.cancel_timer();

        let r: f64 = self.rng.random();
        let crash_point = self.config.crash_table.sample(r);
        self.session.rounds_played += 1;
        self.session.player_joined = joined;
        let number = self.session.rounds_played;
        self.round = Some(Round::new(
            number,
            crash_point,
            self.config.start_discount,
            now_ms,
            joined,
        ));
        self.phase = EnginePhase::Active;
        self.countdown_remaining = None;

        let interval = self.config.tick_interval_ms;
        self.ticker = Some(self.scheduler.schedule_repeating(
            TaskKind::GrowthTick,
            now_ms + interval,
            interval,
        ));

        if let Some(eta) = time_to_reach(
            crash_point,
            self.config.growth_rate,
            self.config.start_discount,
            self.config.max_discount,
        ) {
            log::debug!("Round {} crash scheduled {:.2}s after launch", number, eta);
        }
        self.emit(EngineEvent::RoundStarted {
            round: number,
            joined,
        });
    }

    fn open_countdown(&mut self, now_ms: f64) {
        self.cancel_timer();
        let seconds = self.config.countdown_secs;
        self.phase = EnginePhase::Countdown;
        self.countdown_remaining = Some(seconds);
        self.session.player_joined = false;
        self.schedule_countdown_step(now_ms);
        self.emit(EngineEvent::CountdownStarted { seconds });
    }

    /// Recompute the discount from wall-clock time.
    /// Returns true once the crash point is reached.
    fn update_discount(&mut self, now_ms: f64) -> bool {
        let Some(round) = self.round.as_mut().filter(|r| r.is_active()) else {
            return false;
        };
        let value = discount_at(
            round.elapsed_secs(now_ms),
            self.config.growth_rate,
            self.config.start_discount,
            self.config.max_discount,
        );
        round.discount = round.discount.max(value);
        round.discount >= round.crash_point() - CRASH_EPSILON
    }

    fn on_tick(&mut self, now_ms: f64) {
        if self.phase != EnginePhase::Active {
            return;
        }
        if self.update_discount(now_ms) {
            self.crash(now_ms);
        } else if let Some(round) = &self.round {
            let discount = round.discount;
            self.emit(EngineEvent::Tick { discount });
        }
    }

    fn crash(&mut self, now_ms: f64) {
        let Some(round) = self.round.as_mut() else {
            return;
        };
        let crash_point = round.crash_point();
        if self.config.crash_freeze == CrashFreeze::AtCrashPoint {
            round.discount = crash_point.max(self.config.start_discount);
        }
        round.status = RoundStatus::Crashed;
        let discount = round.discount;
        let number = round.number;
        let joined = round.joined;

        let wipe = match self.config.reset {
            ResetPolicy::Always => true,
            ResetPolicy::OnlyIfJoined => joined,
        };
        if wipe {
            self.session.accumulated_discount = 0.0;
        }
        self.session.history.push(RoundRecord {
            number,
            outcome: Outcome::Crashed,
            discount,
            crash_point,
            joined,
        });

        self.finish(EnginePhase::Crashed, now_ms);
        self.emit(EngineEvent::Crashed {
            round: number,
            discount,
            crash_point,
        });
    }

    /// Leave Active: stop growth, start the re-arm delay
    fn finish(&mut self, phase: EnginePhase, now_ms: f64) {
        self.cancel_ticker();
        self.cancel_timer();
        self.phase = phase;
        self.timer = Some(
            self.scheduler
                .schedule_once(TaskKind::Rearm, now_ms + self.config.rearm_delay_ms),
        );
    }

    fn on_countdown_step(&mut self, at_ms: f64) {
        if self.phase != EnginePhase::Countdown {
            return;
        }
        self.timer = None;
        let remaining = self.countdown_remaining.unwrap_or(0).saturating_sub(1);
        if remaining == 0 {
            // Nobody joined in time
            self.launch(at_ms, false);
        } else {
            self.countdown_remaining = Some(remaining);
            self.schedule_countdown_step(at_ms);
            self.emit(EngineEvent::CountdownStep { remaining });
        }
    }

    /// Steps are chained one-shots so none are lost when the pump falls behind
    fn schedule_countdown_step(&mut self, from_ms: f64) {
        self.timer = Some(
            self.scheduler
                .schedule_once(TaskKind::CountdownStep, from_ms + COUNTDOWN_STEP_MS),
        );
    }

    fn on_rearm(&mut self, at_ms: f64) {
        if !self.phase.is_terminal() {
            return;
        }
        self.timer = None;
        match self.config.restart {
            RestartPolicy::Manual => {
                self.phase = EnginePhase::Idle;
                self.session.player_joined = false;
            }
            RestartPolicy::Automatic if self.config.has_countdown() => {
                self.open_countdown(at_ms);
            }
            RestartPolicy::Automatic => {
                self.launch(at_ms, true);
            }
        }
        let phase = self.phase;
        self.emit(EngineEvent::Rearmed { phase });
    }

    fn cancel_ticker(&mut self) {
        if let Some(id) = self.ticker.take() {
            self.scheduler.cancel(id);
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(id) = self.timer.take() {
            self.scheduler.cancel(id);
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for observer in self.observers.iter_mut() {
            observer.notify(&event, &snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;
    use crate::sim::CrashBand;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Config whose rounds always crash at exactly `crash_point`
    fn fixed_config(rate: f64, crash_point: f64) -> EngineConfig {
        EngineConfig {
            growth_rate: rate,
            tick_interval_ms: 10.0,
            crash_table: CrashTable::new(vec![CrashBand::new(1.0, crash_point, crash_point + 0.004)]),
            ..EngineConfig::default()
        }
    }

    /// Pump the engine in tick-sized steps up to `until_ms`
    fn run(engine: &mut RoundEngine, from_ms: f64, until_ms: f64) {
        let step = engine.config().tick_interval_ms;
        let mut t = from_ms;
        while t <= until_ms {
            engine.advance(t);
            t += step;
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<(EngineEvent, Snapshot)>>>);

    impl Observer for Recorder {
        fn notify(&mut self, event: &EngineEvent, snapshot: &Snapshot) {
            self.0.borrow_mut().push((*event, snapshot.clone()));
        }
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let config = EngineConfig {
            crash_table: CrashTable::new(Vec::new()),
            ..EngineConfig::default()
        };
        assert!(matches!(
            RoundEngine::new(config, 1),
            Err(ConfigError::EmptyCrashTable)
        ));
    }

    #[test]
    fn test_ignite_from_idle() {
        let mut engine = RoundEngine::new(EngineConfig::default(), 7).unwrap();
        assert_eq!(engine.phase(), EnginePhase::Idle);
        assert!(engine.can_ignite());
        assert!(!engine.can_cash_out());

        assert!(engine.ignite(0.0));
        assert_eq!(engine.phase(), EnginePhase::Active);
        let round = engine.round().unwrap();
        assert_eq!(round.discount, 0.01);
        assert_eq!(round.number, 1);
        assert!(engine.session().player_joined);
        assert_eq!(engine.pending(TaskKind::GrowthTick), 1);
    }

    #[test]
    fn test_discount_after_five_seconds() {
        let mut engine = RoundEngine::new(fixed_config(0.2, 99.0), 1).unwrap();
        engine.ignite(0.0);
        run(&mut engine, 0.0, 5_000.0);
        assert_eq!(engine.phase(), EnginePhase::Active);
        assert!((engine.round().unwrap().discount - 1.01).abs() < 1e-9);
    }

    #[test]
    fn test_crash_at_expected_time() {
        let mut engine = RoundEngine::new(fixed_config(1.0, 3.0), 1).unwrap();
        engine.ignite(0.0);
        assert_eq!(engine.round().unwrap().crash_point(), 3.0);

        run(&mut engine, 0.0, 2_980.0);
        assert_eq!(engine.phase(), EnginePhase::Active);

        engine.advance(2_990.0);
        assert_eq!(engine.phase(), EnginePhase::Crashed);
        let round = engine.round().unwrap();
        assert_eq!(round.status, RoundStatus::Crashed);
        assert_eq!(round.discount, 3.0);
        assert_eq!(engine.pending(TaskKind::GrowthTick), 0);
    }

    #[test]
    fn test_late_tick_catches_up() {
        let mut engine = RoundEngine::new(fixed_config(1.0, 50.0), 1).unwrap();
        engine.ignite(0.0);
        // One tick after a long stall lands on the wall-clock value
        engine.advance(4_000.0);
        assert!((engine.round().unwrap().discount - 4.01).abs() < 1e-9);
        assert_eq!(engine.pending(TaskKind::GrowthTick), 1);
    }

    #[test]
    fn test_overshoot_freeze() {
        let config = EngineConfig {
            crash_freeze: CrashFreeze::Overshoot,
            ..fixed_config(1.0, 3.0)
        };
        let mut engine = RoundEngine::new(config, 1).unwrap();
        engine.ignite(0.0);
        engine.advance(3_500.0);
        assert_eq!(engine.phase(), EnginePhase::Crashed);
        assert!((engine.round().unwrap().discount - 3.51).abs() < 1e-9);
    }

    #[test]
    fn test_crash_point_sampled_once() {
        let mut engine = RoundEngine::new(EngineConfig::default(), 1234).unwrap();
        engine.ignite(0.0);
        let crash_point = engine.round().unwrap().crash_point();
        let mut t = 0.0;
        while engine.phase() == EnginePhase::Active && t < 600_000.0 {
            t += 50.0;
            engine.advance(t);
            assert_eq!(engine.round().unwrap().crash_point(), crash_point);
        }
        assert_eq!(engine.phase(), EnginePhase::Crashed);
    }

    #[test]
    fn test_ignite_while_active_is_noop() {
        let mut engine = RoundEngine::new(fixed_config(1.0, 50.0), 9).unwrap();
        engine.ignite(0.0);
        run(&mut engine, 0.0, 1_000.0);
        let before = engine.round().unwrap().clone();

        assert!(!engine.ignite(1_005.0));
        let after = engine.round().unwrap();
        assert_eq!(engine.phase(), EnginePhase::Active);
        assert_eq!(after.crash_point(), before.crash_point());
        assert_eq!(after.discount, before.discount);
        assert_eq!(after.number, before.number);
        assert_eq!(engine.pending(TaskKind::GrowthTick), 1);
    }

    #[test]
    fn test_ignite_during_rearm_delay_is_noop() {
        let mut engine = RoundEngine::new(fixed_config(1.0, 50.0), 9).unwrap();
        engine.ignite(0.0);
        assert!(engine.cash_out(1_000.0));
        assert!(!engine.ignite(1_500.0));
        assert_eq!(engine.phase(), EnginePhase::CashedOut);

        engine.advance(3_000.0);
        assert_eq!(engine.phase(), EnginePhase::Idle);
        assert!(engine.ignite(3_100.0));
        assert_eq!(engine.round().unwrap().number, 2);
    }

    #[test]
    fn test_cash_out_requires_active_round() {
        let mut engine = RoundEngine::new(fixed_config(1.0, 3.0), 1).unwrap();
        assert!(!engine.cash_out(0.0));

        engine.ignite(0.0);
        run(&mut engine, 0.0, 3_000.0);
        assert_eq!(engine.phase(), EnginePhase::Crashed);
        assert!(!engine.cash_out(3_010.0));
        assert_eq!(engine.accumulated_discount(), 0.0);
    }

    #[test]
    fn test_cash_out_twice_applies_once() {
        let mut engine = RoundEngine::new(fixed_config(1.0, 50.0), 1).unwrap();
        engine.ignite(0.0);
        run(&mut engine, 0.0, 1_490.0);
        assert!(engine.cash_out(1_490.0));
        assert!(!engine.cash_out(1_491.0));
        assert!((engine.accumulated_discount() - 1.5).abs() < 1e-9);
        assert_eq!(engine.round().unwrap().status, RoundStatus::CashedOut);
        assert_eq!(engine.pending(TaskKind::GrowthTick), 0);
        assert_eq!(engine.pending(TaskKind::Rearm), 1);
    }

    #[test]
    fn test_cash_out_past_crash_point_crashes() {
        let mut engine = RoundEngine::new(fixed_config(1.0, 3.0), 1).unwrap();
        engine.ignite(0.0);
        // No tick has run yet, but the rocket is already past its crash point
        assert!(!engine.cash_out(5_000.0));
        assert_eq!(engine.phase(), EnginePhase::Crashed);
        assert_eq!(engine.round().unwrap().discount, 3.0);
    }

    #[test]
    fn test_consecutive_cash_outs_accumulate() {
        let mut engine = RoundEngine::new(fixed_config(1.0, 50.0), 1).unwrap();

        engine.ignite(0.0);
        assert!(engine.cash_out(1_490.0));
        engine.advance(3_490.0);
        assert_eq!(engine.phase(), EnginePhase::Idle);

        engine.ignite(4_000.0);
        assert!(engine.cash_out(6_290.0));
        assert!((engine.accumulated_discount() - 3.8).abs() < 1e-9);
        assert!((engine.session().history.total_cashed_out() - 3.8).abs() < 1e-9);
    }

    #[test]
    fn test_crash_resets_accumulated() {
        let mut engine = RoundEngine::new(fixed_config(1.0, 3.0), 1).unwrap();
        engine.ignite(0.0);
        assert!(engine.cash_out(1_000.0));
        assert!(engine.accumulated_discount() > 0.0);
        engine.advance(3_000.0);

        engine.ignite(3_000.0);
        run(&mut engine, 3_000.0, 7_000.0);
        assert_eq!(engine.session().history.crash_count(), 1);
        assert_eq!(engine.accumulated_discount(), 0.0);
    }

    #[test]
    fn test_countdown_join() {
        let config = EngineConfig {
            crash_table: fixed_config(1.0, 50.0).crash_table,
            ..EngineConfig::from_preset(Preset::Countdown)
        };
        let mut engine = RoundEngine::new(config, 1).unwrap();
        assert!(engine.start(0.0));
        assert!(!engine.start(0.0));
        assert_eq!(engine.phase(), EnginePhase::Countdown);
        assert_eq!(engine.snapshot().countdown_remaining, Some(5));

        engine.advance(2_000.0);
        assert_eq!(engine.snapshot().countdown_remaining, Some(3));

        assert!(engine.ignite(2_500.0));
        assert_eq!(engine.phase(), EnginePhase::Active);
        assert!(engine.session().player_joined);
        assert_eq!(engine.pending(TaskKind::CountdownStep), 0);
        assert!(engine.can_cash_out());
        let snapshot = engine.snapshot();
        assert!(snapshot.can_cash_out);
        assert!(!snapshot.can_ignite);
    }

    #[test]
    fn test_countdown_timeout_starts_without_player() {
        let config = EngineConfig {
            crash_table: fixed_config(1.0, 50.0).crash_table,
            ..EngineConfig::from_preset(Preset::Countdown)
        };
        let mut engine = RoundEngine::new(config, 1).unwrap();
        engine.start(0.0);
        engine.advance(4_999.0);
        assert_eq!(engine.phase(), EnginePhase::Countdown);
        engine.advance(5_000.0);
        assert_eq!(engine.phase(), EnginePhase::Active);
        assert!(!engine.session().player_joined);
        assert_eq!(engine.round().unwrap().started_at_ms, 5_000.0);

        assert!(!engine.can_cash_out());
        assert!(!engine.cash_out(6_000.0));
        assert_eq!(engine.phase(), EnginePhase::Active);
    }

    #[test]
    fn test_spectated_crash_keeps_accumulated() {
        let mut config = EngineConfig {
            crash_table: fixed_config(1.0, 3.0).crash_table,
            growth_rate: 1.0,
            ..EngineConfig::from_preset(Preset::Countdown)
        };
        config.tick_interval_ms = 10.0;
        let mut engine = RoundEngine::new(config, 1).unwrap();

        // Join and win
        engine.start(0.0);
        engine.ignite(100.0);
        assert!(engine.cash_out(1_100.0));
        let banked = engine.accumulated_discount();
        assert!((banked - 1.01).abs() < 1e-9);

        // Re-arm into a countdown that nobody joins; that round crashes
        run(&mut engine, 1_100.0, 3_100.0);
        assert_eq!(engine.phase(), EnginePhase::Countdown);
        run(&mut engine, 3_100.0, 12_000.0);
        assert_eq!(engine.session().history.crash_count(), 1);
        assert_eq!(engine.accumulated_discount(), banked);
    }

    #[test]
    fn test_spectated_crash_wipes_accumulated_when_reset_always() {
        let config = EngineConfig {
            crash_table: fixed_config(1.0, 3.0).crash_table,
            growth_rate: 1.0,
            tick_interval_ms: 10.0,
            reset: ResetPolicy::Always,
            ..EngineConfig::from_preset(Preset::Countdown)
        };
        let mut engine = RoundEngine::new(config, 1).unwrap();

        engine.start(0.0);
        engine.ignite(100.0);
        assert!(engine.cash_out(1_100.0));
        assert!(engine.accumulated_discount() > 0.0);

        // Nobody joins the next flight, and it still takes the bank with it
        run(&mut engine, 1_100.0, 12_000.0);
        assert_eq!(engine.session().history.crash_count(), 1);
        assert!(!engine.session().history.last().unwrap().joined);
        assert_eq!(engine.accumulated_discount(), 0.0);
    }

    #[test]
    fn test_joined_crash_wipes_accumulated_in_countdown_mode() {
        let config = EngineConfig {
            crash_table: fixed_config(1.0, 3.0).crash_table,
            growth_rate: 1.0,
            tick_interval_ms: 10.0,
            ..EngineConfig::from_preset(Preset::Countdown)
        };
        let mut engine = RoundEngine::new(config, 1).unwrap();
        engine.start(0.0);
        engine.ignite(0.0);
        assert!(engine.cash_out(1_000.0));

        run(&mut engine, 1_000.0, 3_000.0);
        assert_eq!(engine.phase(), EnginePhase::Countdown);
        engine.ignite(3_000.0);
        run(&mut engine, 3_000.0, 7_000.0);
        assert_eq!(engine.phase(), EnginePhase::Crashed);
        assert_eq!(engine.accumulated_discount(), 0.0);
    }

    #[test]
    fn test_automatic_restart_without_countdown() {
        let config = EngineConfig {
            restart: RestartPolicy::Automatic,
            ..fixed_config(1.0, 2.0)
        };
        let mut engine = RoundEngine::new(config, 1).unwrap();
        engine.ignite(0.0);
        run(&mut engine, 0.0, 2_000.0);
        assert_eq!(engine.phase(), EnginePhase::Crashed);
        run(&mut engine, 2_000.0, 4_000.0);
        assert_eq!(engine.phase(), EnginePhase::Active);
        assert_eq!(engine.round().unwrap().number, 2);
        assert!(engine.session().player_joined);
    }

    #[test]
    fn test_never_more_than_one_timer_per_kind() {
        let config = EngineConfig {
            rearm_delay_ms: 0.0,
            ..EngineConfig::from_preset(Preset::Countdown)
        };
        let mut engine = RoundEngine::new(config, 42).unwrap();
        engine.start(0.0);
        let mut t = 0.0;
        while t < 120_000.0 {
            t += 50.0;
            // Mash both buttons every so often
            if (t as u64) % 700 == 0 {
                engine.ignite(t);
            }
            if (t as u64) % 1_300 == 0 {
                engine.cash_out(t);
            }
            engine.advance(t);

            let ticks = engine.pending(TaskKind::GrowthTick);
            let timers = engine.pending(TaskKind::CountdownStep) + engine.pending(TaskKind::Rearm);
            assert!(ticks <= 1 && timers <= 1);
            assert_eq!(ticks == 1, engine.phase() == EnginePhase::Active);
            assert_eq!(timers == 1, engine.phase() != EnginePhase::Active);
        }
        assert!(engine.session().rounds_played > 1);
    }

    #[test]
    fn test_observer_sees_transitions() {
        let recorder = Recorder::default();
        let mut engine = RoundEngine::new(fixed_config(1.0, 3.0), 1).unwrap();
        engine.subscribe(Box::new(recorder.clone()));

        engine.ignite(0.0);
        run(&mut engine, 0.0, 5_000.0);

        let log = recorder.0.borrow();
        assert!(matches!(log[0].0, EngineEvent::RoundStarted { round: 1, joined: true }));
        assert_eq!(log[0].1.crash_point, None);
        assert!(log.iter().any(|(e, _)| matches!(e, EngineEvent::Tick { .. })));

        let (_, crashed) = log
            .iter()
            .find(|(e, _)| matches!(e, EngineEvent::Crashed { .. }))
            .unwrap();
        assert!(crashed.crashed);
        assert_eq!(crashed.crash_point, Some(3.0));
        assert_eq!(crashed.status, RoundStatus::Crashed);

        assert!(matches!(
            log.last().unwrap().0,
            EngineEvent::Rearmed { phase: EnginePhase::Idle }
        ));

        // Ticks never go backwards
        let ticks: Vec<f64> = log
            .iter()
            .filter_map(|(e, _)| match e {
                EngineEvent::Tick { discount } => Some(*discount),
                _ => None,
            })
            .collect();
        assert!(ticks.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_same_seed_same_crash_points() {
        let mut a = RoundEngine::new(EngineConfig::default(), 2024).unwrap();
        let mut b = RoundEngine::new(EngineConfig::default(), 2024).unwrap();
        for n in 0..10 {
            let t = n as f64 * 1_000_000.0;
            a.ignite(t);
            b.ignite(t);
            assert_eq!(
                a.round().unwrap().crash_point(),
                b.round().unwrap().crash_point()
            );
            a.advance(t + 600_000.0);
            b.advance(t + 600_000.0);
            a.advance(t + 900_000.0);
            b.advance(t + 900_000.0);
        }
    }

    proptest! {
        #[test]
        fn prop_consecutive_cash_outs_sum(holds in proptest::collection::vec(1u32..40_000, 1..8)) {
            let mut engine = RoundEngine::new(fixed_config(1.0, 50.0), 3).unwrap();
            let mut t = 0.0;
            let mut banked = 0.0;
            for hold in holds {
                prop_assert!(engine.ignite(t));
                t += f64::from(hold);
                prop_assert!(engine.cash_out(t));
                banked += engine.round().unwrap().discount;
                t += engine.config().rearm_delay_ms;
                engine.advance(t);
                prop_assert_eq!(engine.phase(), EnginePhase::Idle);
            }
            prop_assert!((engine.accumulated_discount() - banked).abs() < 1e-9);
            prop_assert_eq!(engine.session().history.crash_count(), 0);
        }
    }
}
