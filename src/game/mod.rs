//! Session state machine shared by both test modes.
//!
//! `Session::dispatch` is the only way state changes. It consumes one `Input`
//! (user action or timer firing), mutates the single `Phase` value and returns
//! the side effects the browser shell must perform. The core never touches the
//! DOM or the clock itself, so it runs unchanged under `cargo test`.

pub mod accuracy;
pub mod reaction;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::error::GameError;
use crate::ranking::{RankingEntry, sort_entries};

pub use accuracy::{AccuracyEngine, Side, Target, TargetClick, Viewport, score_for_distance};
pub use reaction::{ReactionEngine, ReactionSample, TileClick, TileState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Reaction,
    Accuracy,
}

/// Timers the shell keeps, at most one live handle per slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    Countdown,
    Activation,
    Motion,
    Progress,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    Start { mode: Mode, identifier: String },
    Timer(TimerSlot),
    TileClick(usize),
    TargetClick { x: f64, y: f64 },
    Resize(Viewport),
    GoHome,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Arm `slot` to fire after `delay_ms`, replacing any pending handle.
    Schedule { slot: TimerSlot, delay_ms: f64 },
    Cancel(TimerSlot),
    Alert(String),
    Reload,
    Navigate(String),
    SaveRankings(Vec<RankingEntry>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Countdown {
    pub mode: Mode,
    pub value: u8,
    /// Second half of a step: the number is fading out.
    pub fading: bool,
}

#[derive(Clone, Debug)]
pub enum ActiveRun {
    Reaction(ReactionEngine),
    Accuracy(AccuracyEngine),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Reaction { identifier: String, average_ms: f64, latest_ms: f64 },
    Accuracy { mean_score: f64 },
}

impl Outcome {
    pub fn message(&self) -> String {
        match self {
            Outcome::Reaction { average_ms, .. } => {
                format!("Success! Your average reaction time is {average_ms:.2}ms.")
            }
            Outcome::Accuracy { mean_score } => {
                format!("Done! Your average accuracy score is {mean_score:.2}.")
            }
        }
    }
}

#[derive(Clone, Debug)]
pub enum Phase {
    Idle,
    Countdown(Countdown),
    Active(ActiveRun),
    Finished(Outcome),
}

impl Phase {
    fn timer_slots(&self) -> &'static [TimerSlot] {
        match self {
            Phase::Countdown(_) => &[TimerSlot::Countdown],
            Phase::Active(ActiveRun::Reaction(_)) => &[TimerSlot::Activation],
            Phase::Active(ActiveRun::Accuracy(_)) => &[TimerSlot::Motion, TimerSlot::Progress],
            Phase::Idle | Phase::Finished(_) => &[],
        }
    }
}

pub struct Session {
    config: GameConfig,
    viewport: Viewport,
    phase: Phase,
    identifier: String,
    rankings: Vec<RankingEntry>,
}

impl Session {
    pub fn new(config: GameConfig, viewport: Viewport, mut rankings: Vec<RankingEntry>) -> Self {
        sort_entries(&mut rankings);
        Self { config, viewport, phase: Phase::Idle, identifier: String::new(), rankings }
    }

    pub fn dispatch<R: Rng + ?Sized>(&mut self, input: Input, now: f64, rng: &mut R) -> Vec<Effect> {
        match input {
            Input::Start { mode, identifier } => self.request_start(mode, identifier),
            Input::Timer(TimerSlot::Countdown) => self.countdown_tick(now, rng),
            Input::Timer(TimerSlot::Activation) => self.activation_tick(now, rng),
            Input::Timer(TimerSlot::Motion) => self.motion_tick(now, rng),
            Input::Timer(TimerSlot::Progress) => self.progress_tick(now),
            Input::TileClick(index) => self.tile_click(index, now, rng),
            Input::TargetClick { x, y } => self.target_click(x, y, rng),
            Input::Resize(viewport) => {
                self.viewport = viewport;
                if let Phase::Active(ActiveRun::Accuracy(eng)) = &mut self.phase {
                    eng.set_viewport(viewport);
                }
                Vec::new()
            }
            Input::GoHome => self.go_home(),
        }
    }

    fn request_start(&mut self, mode: Mode, identifier: String) -> Vec<Effect> {
        if !matches!(self.phase, Phase::Idle | Phase::Finished(_)) {
            debug!(?mode, "start ignored while a run is in progress");
            return Vec::new();
        }
        let identifier = identifier.trim().to_string();
        if mode == Mode::Reaction && identifier.is_empty() {
            return self.on_error(GameError::MissingIdentifier);
        }
        info!(?mode, %identifier, "countdown started");
        self.identifier = identifier;
        self.phase = Phase::Countdown(Countdown {
            mode,
            value: self.config.countdown_from,
            fading: false,
        });
        vec![Effect::Schedule {
            slot: TimerSlot::Countdown,
            delay_ms: self.config.countdown_display_ms,
        }]
    }

    fn countdown_tick<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Vec<Effect> {
        let Phase::Countdown(cd) = &mut self.phase else {
            return Vec::new();
        };
        if !cd.fading {
            cd.fading = true;
            return vec![Effect::Schedule {
                slot: TimerSlot::Countdown,
                delay_ms: self.config.countdown_fade_ms,
            }];
        }
        if cd.value > 1 {
            cd.value -= 1;
            cd.fading = false;
            return vec![Effect::Schedule {
                slot: TimerSlot::Countdown,
                delay_ms: self.config.countdown_display_ms,
            }];
        }
        let mode = cd.mode;
        self.start_mode(mode, now, rng)
    }

    fn start_mode<R: Rng + ?Sized>(&mut self, mode: Mode, now: f64, rng: &mut R) -> Vec<Effect> {
        let mut effects = self.leave_phase();
        match mode {
            Mode::Reaction => {
                let mut eng = ReactionEngine::new(&self.config);
                let delay_ms = eng.start(rng);
                self.phase = Phase::Active(ActiveRun::Reaction(eng));
                effects.push(Effect::Schedule { slot: TimerSlot::Activation, delay_ms });
            }
            Mode::Accuracy => {
                let eng = AccuracyEngine::start(&self.config, self.viewport, now, rng);
                self.phase = Phase::Active(ActiveRun::Accuracy(eng));
                effects.push(Effect::Schedule {
                    slot: TimerSlot::Motion,
                    delay_ms: self.config.motion_tick_ms,
                });
                effects.push(Effect::Schedule {
                    slot: TimerSlot::Progress,
                    delay_ms: self.config.progress_tick_ms,
                });
            }
        }
        info!(?mode, "run started");
        effects
    }

    fn activation_tick<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Vec<Effect> {
        let Phase::Active(ActiveRun::Reaction(eng)) = &mut self.phase else {
            return Vec::new();
        };
        match eng.activate(now, rng) {
            Some(_) => vec![Effect::Schedule {
                slot: TimerSlot::Activation,
                delay_ms: eng.next_delay(rng),
            }],
            None => Vec::new(),
        }
    }

    fn tile_click<R: Rng + ?Sized>(&mut self, index: usize, now: f64, rng: &mut R) -> Vec<Effect> {
        let result = match &mut self.phase {
            Phase::Finished(_) => return Vec::new(),
            Phase::Active(ActiveRun::Reaction(eng)) => eng.click(index, now),
            _ => Err(GameError::WrongTile { index, active: None }),
        };
        match result {
            Ok(TileClick::Cleared { .. }) => {
                let Phase::Active(ActiveRun::Reaction(eng)) = &self.phase else {
                    return Vec::new();
                };
                // The grid changed: restart the activation timer with a fresh delay.
                vec![Effect::Schedule { slot: TimerSlot::Activation, delay_ms: eng.next_delay(rng) }]
            }
            Ok(TileClick::Completed { reaction_ms, average_ms }) => {
                self.on_mode_complete(Outcome::Reaction {
                    identifier: self.identifier.clone(),
                    average_ms,
                    latest_ms: reaction_ms,
                })
            }
            Err(err) => self.on_error(err),
        }
    }

    fn motion_tick<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Vec<Effect> {
        let Phase::Active(ActiveRun::Accuracy(eng)) = &mut self.phase else {
            return Vec::new();
        };
        eng.advance(now, rng);
        vec![Effect::Schedule { slot: TimerSlot::Motion, delay_ms: self.config.motion_tick_ms }]
    }

    fn progress_tick(&mut self, now: f64) -> Vec<Effect> {
        let Phase::Active(ActiveRun::Accuracy(eng)) = &self.phase else {
            return Vec::new();
        };
        match eng.progress(now) {
            Ok(_) => vec![Effect::Schedule {
                slot: TimerSlot::Progress,
                delay_ms: self.config.progress_tick_ms,
            }],
            Err(err) => self.on_error(err),
        }
    }

    fn target_click<R: Rng + ?Sized>(&mut self, x: f64, y: f64, rng: &mut R) -> Vec<Effect> {
        let Phase::Active(ActiveRun::Accuracy(eng)) = &mut self.phase else {
            return Vec::new();
        };
        match eng.click(x, y, rng) {
            TargetClick::Scored { .. } => Vec::new(),
            TargetClick::Completed { mean_score, .. } => {
                self.on_mode_complete(Outcome::Accuracy { mean_score })
            }
        }
    }

    fn on_mode_complete(&mut self, outcome: Outcome) -> Vec<Effect> {
        let mut effects = self.leave_phase();
        info!(?outcome, "run finished");
        effects.push(Effect::Alert(outcome.message()));
        if let Outcome::Reaction { identifier, average_ms, .. } = &outcome {
            self.rankings.push(RankingEntry::new(identifier.clone(), *average_ms));
            sort_entries(&mut self.rankings);
            effects.push(Effect::SaveRankings(self.rankings.clone()));
        }
        self.phase = Phase::Finished(outcome);
        effects
    }

    /// Non-fatal errors only alert the player. Fatal ones cancel everything
    /// and discard the run.
    fn on_error(&mut self, err: GameError) -> Vec<Effect> {
        if !err.is_fatal() {
            debug!(error = %err, "rejected");
            return vec![Effect::Alert(err.user_message())];
        }
        warn!(error = %err, "run aborted");
        let mut effects = self.leave_phase();
        effects.push(Effect::Alert(err.user_message()));
        effects.push(match err {
            GameError::Timeout { .. } => Effect::Navigate(self.config.home_url.clone()),
            _ => Effect::Reload,
        });
        self.phase = Phase::Idle;
        self.identifier.clear();
        effects
    }

    fn go_home(&mut self) -> Vec<Effect> {
        let mut effects = self.leave_phase();
        self.phase = Phase::Idle;
        effects.push(Effect::Navigate(self.config.home_url.clone()));
        effects
    }

    /// Cancel effects for every timer owned by the current phase.
    fn leave_phase(&self) -> Vec<Effect> {
        self.phase.timer_slots().iter().map(|s| Effect::Cancel(*s)).collect()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn mode(&self) -> Option<Mode> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Countdown(cd) => Some(cd.mode),
            Phase::Active(ActiveRun::Reaction(_)) => Some(Mode::Reaction),
            Phase::Active(ActiveRun::Accuracy(_)) => Some(Mode::Accuracy),
            Phase::Finished(Outcome::Reaction { .. }) => Some(Mode::Reaction),
            Phase::Finished(Outcome::Accuracy { .. }) => Some(Mode::Accuracy),
        }
    }

    pub fn countdown_value(&self) -> Option<u8> {
        match &self.phase {
            Phase::Countdown(cd) => Some(cd.value),
            _ => None,
        }
    }

    pub fn reaction(&self) -> Option<&ReactionEngine> {
        match &self.phase {
            Phase::Active(ActiveRun::Reaction(eng)) => Some(eng),
            _ => None,
        }
    }

    pub fn accuracy(&self) -> Option<&AccuracyEngine> {
        match &self.phase {
            Phase::Active(ActiveRun::Accuracy(eng)) => Some(eng),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match &self.phase {
            Phase::Finished(o) => Some(o),
            _ => None,
        }
    }

    pub fn rankings(&self) -> &[RankingEntry] {
        &self.rankings
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn session() -> (Session, StdRng) {
        let s = Session::new(GameConfig::default(), Viewport::new(800.0, 600.0), Vec::new());
        (s, StdRng::seed_from_u64(42))
    }

    fn start(s: &mut Session, rng: &mut StdRng, mode: Mode, id: &str) -> Vec<Effect> {
        s.dispatch(Input::Start { mode, identifier: id.to_string() }, 0.0, rng)
    }

    #[test]
    fn reaction_start_requires_identifier() {
        let (mut s, mut rng) = session();
        let fx = start(&mut s, &mut rng, Mode::Reaction, "   ");
        assert_eq!(fx, vec![Effect::Alert("Please enter an ID.".into())]);
        assert!(matches!(s.phase(), Phase::Idle));
    }

    #[test]
    fn accuracy_start_needs_no_identifier() {
        let (mut s, mut rng) = session();
        let fx = start(&mut s, &mut rng, Mode::Accuracy, "");
        assert_eq!(s.countdown_value(), Some(3));
        assert_eq!(fx, vec![Effect::Schedule { slot: TimerSlot::Countdown, delay_ms: 1000.0 }]);
    }

    #[test]
    fn countdown_alternates_display_and_fade() {
        let (mut s, mut rng) = session();
        start(&mut s, &mut rng, Mode::Reaction, "kim");
        let mut delays = Vec::new();
        let mut values = Vec::new();
        for _ in 0..5 {
            let fx = s.dispatch(Input::Timer(TimerSlot::Countdown), 0.0, &mut rng);
            values.push(s.countdown_value());
            if let [Effect::Schedule { slot: TimerSlot::Countdown, delay_ms }] = fx.as_slice() {
                delays.push(*delay_ms);
            }
        }
        assert_eq!(delays, vec![400.0, 1000.0, 400.0, 1000.0, 400.0]);
        assert_eq!(values, vec![Some(3), Some(2), Some(2), Some(1), Some(1)]);

        let fx = s.dispatch(Input::Timer(TimerSlot::Countdown), 0.0, &mut rng);
        assert_eq!(s.countdown_value(), None);
        assert!(s.reaction().is_some());
        assert_eq!(fx[0], Effect::Cancel(TimerSlot::Countdown));
        assert!(matches!(fx[1], Effect::Schedule { slot: TimerSlot::Activation, delay_ms } if (1000.0..=2200.0).contains(&delay_ms)));
    }

    #[test]
    fn second_start_during_countdown_is_ignored() {
        let (mut s, mut rng) = session();
        start(&mut s, &mut rng, Mode::Reaction, "kim");
        assert!(start(&mut s, &mut rng, Mode::Accuracy, "").is_empty());
        assert_eq!(s.mode(), Some(Mode::Reaction));
    }

    #[test]
    fn stale_timers_do_not_mutate_idle_session() {
        let (mut s, mut rng) = session();
        for slot in [TimerSlot::Countdown, TimerSlot::Activation, TimerSlot::Motion, TimerSlot::Progress] {
            assert!(s.dispatch(Input::Timer(slot), 0.0, &mut rng).is_empty());
        }
        assert!(matches!(s.phase(), Phase::Idle));
    }

    #[test]
    fn go_home_cancels_owned_timers() {
        let (mut s, mut rng) = session();
        start(&mut s, &mut rng, Mode::Accuracy, "");
        let fx = s.dispatch(Input::GoHome, 0.0, &mut rng);
        assert_eq!(fx, vec![Effect::Cancel(TimerSlot::Countdown), Effect::Navigate("/".into())]);
    }

    #[test]
    fn non_fatal_error_keeps_the_run() {
        let (mut s, mut rng) = session();
        start(&mut s, &mut rng, Mode::Accuracy, "");
        let fx = s.on_error(GameError::Storage("quota exceeded".into()));
        assert_eq!(fx, vec![Effect::Alert("Storage Error: quota exceeded".into())]);
        assert_eq!(s.countdown_value(), Some(3));
    }

    #[test]
    fn fatal_error_discards_the_run() {
        let (mut s, mut rng) = session();
        start(&mut s, &mut rng, Mode::Reaction, "kim");
        let fx = s.on_error(GameError::Timeout { elapsed_ms: 20_000.0 });
        assert_eq!(
            fx,
            vec![
                Effect::Cancel(TimerSlot::Countdown),
                Effect::Alert("Time is up! Returning home.".into()),
                Effect::Navigate("/".into()),
            ]
        );
        assert!(matches!(s.phase(), Phase::Idle));
        let fx = start(&mut s, &mut rng, Mode::Reaction, "kim");
        assert_eq!(fx.len(), 1);
        let fx = s.on_error(GameError::WrongTile { index: 4, active: None });
        assert_eq!(fx.last(), Some(&Effect::Reload));
    }
}
