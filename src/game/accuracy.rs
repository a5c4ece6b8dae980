//! Accuracy mode: a target drifts across the play area; clicks are scored by
//! how close they land to its centre.

use rand::Rng;
use tracing::debug;

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};

/// Strict upper distance bound and the score awarded below it, best first.
pub const SCORE_TABLE: [(f64, f64); 15] = [
    (3.0, 10.0),
    (5.0, 9.95),
    (7.0, 9.9),
    (9.0, 9.85),
    (11.0, 9.7),
    (13.0, 9.6),
    (15.0, 9.35),
    (17.0, 9.1),
    (20.0, 8.85),
    (22.0, 8.4),
    (24.0, 8.1),
    (27.0, 7.7),
    (30.0, 7.35),
    (33.0, 6.6),
    (35.0, 5.85),
];

/// Score for any click at or beyond the last table bound.
pub const FALLBACK_SCORE: f64 = 5.0;

pub fn score_for_distance(distance: f64) -> f64 {
    SCORE_TABLE
        .iter()
        .find(|(bound, _)| distance < *bound)
        .map(|(_, score)| *score)
        .unwrap_or(FALLBACK_SCORE)
}

/// Play-area size in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn left_bound(&self) -> f64 {
        self.width / 4.0
    }

    fn right_bound(&self) -> f64 {
        self.width * 3.0 / 4.0
    }
}

/// Quarter of the play area the target starts from; it travels toward the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    fn direction(self) -> f64 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub center_x: f64,
    pub center_y: f64,
    pub side: Side,
}

impl Target {
    pub fn spawn<R: Rng + ?Sized>(viewport: Viewport, rng: &mut R) -> Self {
        let side = if rng.gen_bool(0.5) { Side::Left } else { Side::Right };
        let center_x = match side {
            Side::Left => viewport.left_bound(),
            Side::Right => viewport.right_bound(),
        };
        let top = viewport.height / 4.0;
        let center_y = top + rng.gen_range(0.0..=viewport.height / 2.0);
        Self { center_x, center_y, side }
    }

    /// Outside the horizontal band between the left and right quarter marks.
    pub fn out_of_band(&self, viewport: Viewport) -> bool {
        self.center_x < viewport.left_bound() || self.center_x > viewport.right_bound()
    }

    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (x - self.center_x).hypot(y - self.center_y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccuracyAttempt {
    pub click_x: f64,
    pub click_y: f64,
    pub target_x: f64,
    pub target_y: f64,
    pub distance: f64,
    pub score: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TargetClick {
    Scored { score: f64, remaining: u32 },
    Completed { score: f64, mean_score: f64 },
}

#[derive(Clone, Debug)]
pub struct AccuracyEngine {
    viewport: Viewport,
    target: Target,
    remaining: u32,
    attempts: Vec<AccuracyAttempt>,
    started_at: f64,
    last_motion_at: f64,
    time_budget_ms: f64,
    speed_px_per_ms: f64,
    max_step_ms: f64,
}

impl AccuracyEngine {
    pub fn start<R: Rng + ?Sized>(
        config: &GameConfig,
        viewport: Viewport,
        now: f64,
        rng: &mut R,
    ) -> Self {
        Self {
            viewport,
            target: Target::spawn(viewport, rng),
            remaining: config.accuracy_attempts,
            attempts: Vec::with_capacity(config.accuracy_attempts as usize),
            started_at: now,
            last_motion_at: now,
            time_budget_ms: config.accuracy_time_budget_ms,
            speed_px_per_ms: config.target_speed_px_per_ms,
            max_step_ms: config.max_motion_step_ms,
        }
    }

    /// Move the target by the distance covered since the previous update.
    /// Returns true when the target left its band and was recreated.
    pub fn advance<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> bool {
        let dt = (now - self.last_motion_at).clamp(0.0, self.max_step_ms);
        self.last_motion_at = now;
        self.target.center_x += self.target.side.direction() * self.speed_px_per_ms * dt;
        if self.target.out_of_band(self.viewport) {
            self.target = Target::spawn(self.viewport, rng);
            true
        } else {
            false
        }
    }

    /// Remaining share of the time budget in `[0, 1]`, or a timeout error once
    /// the budget is spent with attempts left.
    pub fn progress(&self, now: f64) -> GameResult<f64> {
        let elapsed = now - self.started_at;
        if elapsed >= self.time_budget_ms && self.remaining > 0 {
            return Err(GameError::Timeout { elapsed_ms: elapsed });
        }
        Ok(self.remaining_fraction(now))
    }

    pub fn remaining_fraction(&self, now: f64) -> f64 {
        let elapsed = now - self.started_at;
        ((self.time_budget_ms - elapsed) / self.time_budget_ms).clamp(0.0, 1.0)
    }

    pub fn click<R: Rng + ?Sized>(&mut self, x: f64, y: f64, rng: &mut R) -> TargetClick {
        let distance = self.target.distance_to(x, y);
        let score = score_for_distance(distance);
        self.attempts.push(AccuracyAttempt {
            click_x: x,
            click_y: y,
            target_x: self.target.center_x,
            target_y: self.target.center_y,
            distance,
            score,
        });
        self.remaining = self.remaining.saturating_sub(1);
        debug!(distance, score, remaining = self.remaining, "target clicked");

        if self.remaining == 0 {
            TargetClick::Completed { score, mean_score: self.mean_score().unwrap_or(score) }
        } else {
            self.target = Target::spawn(self.viewport, rng);
            TargetClick::Scored { score, remaining: self.remaining }
        }
    }

    pub fn mean_score(&self) -> Option<f64> {
        if self.attempts.is_empty() {
            return None;
        }
        Some(self.attempts.iter().map(|a| a.score).sum::<f64>() / self.attempts.len() as f64)
    }

    /// Whether `(x, y)` lands on the drawn target disc.
    pub fn hits(&self, x: f64, y: f64, radius: f64) -> bool {
        self.target.distance_to(x, y) <= radius
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.remaining
    }

    pub fn attempts(&self) -> &[AccuracyAttempt] {
        &self.attempts
    }

    pub fn last_score(&self) -> Option<f64> {
        self.attempts.last().map(|a| a.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const VIEW: Viewport = Viewport { width: 800.0, height: 600.0 };

    #[test]
    fn spawn_stays_in_quarter_marks_and_middle_half() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let t = Target::spawn(VIEW, &mut rng);
            match t.side {
                Side::Left => assert_eq!(t.center_x, 200.0),
                Side::Right => assert_eq!(t.center_x, 600.0),
            }
            assert!((150.0..=450.0).contains(&t.center_y), "y {}", t.center_y);
            assert!(!t.out_of_band(VIEW));
        }
    }

    #[test]
    fn motion_depends_on_elapsed_time_not_tick_count() {
        let cfg = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut fine = AccuracyEngine::start(&cfg, VIEW, 0.0, &mut rng);
        let mut coarse = fine.clone();
        for step in 1..=6 {
            fine.advance(step as f64 * 10.0, &mut rng);
        }
        coarse.advance(60.0, &mut rng);
        assert!((fine.target().center_x - coarse.target().center_x).abs() < 1e-9);
        let moved = (fine.target().center_x - 200.0).abs().min((fine.target().center_x - 600.0).abs());
        assert!((moved - 18.0).abs() < 1e-9, "moved {moved}");
    }

    #[test]
    fn large_gaps_are_clamped() {
        let cfg = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut eng = AccuracyEngine::start(&cfg, VIEW, 0.0, &mut rng);
        let before = eng.target();
        let respawned = eng.advance(5_000.0, &mut rng);
        assert!(!respawned);
        assert!((eng.target().center_x - before.center_x).abs() <= 30.0 + 1e-9);
    }

    #[test]
    fn target_respawns_after_crossing_the_band() {
        let cfg = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut eng = AccuracyEngine::start(&cfg, VIEW, 0.0, &mut rng);
        // 400px band at 0.3px/ms takes ~1334ms.
        let mut respawns = 0;
        let mut now = 0.0;
        while now < 1_500.0 {
            now += 17.0;
            if eng.advance(now, &mut rng) {
                respawns += 1;
            }
            assert!(!eng.target().out_of_band(VIEW));
        }
        assert!(respawns >= 1);
    }

    #[test]
    fn progress_fraction_and_timeout() {
        let cfg = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let eng = AccuracyEngine::start(&cfg, VIEW, 1_000.0, &mut rng);
        assert_eq!(eng.progress(1_000.0).unwrap(), 1.0);
        assert!((eng.progress(11_000.0).unwrap() - 0.5).abs() < 1e-9);
        assert!(eng.progress(20_999.0).is_ok());
        let err = eng.progress(21_000.0).unwrap_err();
        assert!(matches!(err, GameError::Timeout { .. }));
    }

    #[test]
    fn click_on_centre_scores_ten_and_recreates_target() {
        let cfg = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut eng = AccuracyEngine::start(&cfg, VIEW, 0.0, &mut rng);
        let t = eng.target();
        let out = eng.click(t.center_x, t.center_y, &mut rng);
        assert_eq!(out, TargetClick::Scored { score: 10.0, remaining: 9 });
        assert_eq!(eng.attempts()[0].distance, 0.0);
        assert!(eng.hits(eng.target().center_x + 39.0, eng.target().center_y, 40.0));
        assert!(!eng.hits(eng.target().center_x + 41.0, eng.target().center_y, 40.0));
    }

    #[test]
    fn tenth_click_exhausts_attempts_and_completes() {
        let cfg = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(21);
        let mut eng = AccuracyEngine::start(&cfg, VIEW, 0.0, &mut rng);
        let mut completions = 0;
        for i in 1..=10u32 {
            let t = eng.target();
            match eng.click(t.center_x, t.center_y, &mut rng) {
                TargetClick::Scored { remaining, .. } => assert_eq!(remaining, 10 - i),
                TargetClick::Completed { mean_score, .. } => {
                    assert_eq!(i, 10);
                    assert_eq!(mean_score, 10.0);
                    completions += 1;
                }
            }
            assert_eq!(eng.remaining_attempts(), 10 - i);
        }
        assert_eq!(completions, 1);
        assert_eq!(eng.attempts().len(), 10);
    }
}
