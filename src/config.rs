//! Tunable gameplay constants.
//!
//! Every field has a default matching the canonical game; a host page may pass a
//! partial JSON object to `start_app_with_config` to override individual values.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, GameResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// First number shown by the pre-game countdown.
    pub countdown_from: u8,
    /// How long each countdown number stays fully visible.
    pub countdown_display_ms: f64,
    /// Fade-out between two countdown numbers.
    pub countdown_fade_ms: f64,

    /// Number of tiles in the reaction grid (rendered as a square).
    pub grid_tiles: usize,
    /// Inclusive lower bound of the randomized activation delay.
    pub activation_min_ms: f64,
    /// Inclusive upper bound of the randomized activation delay.
    pub activation_max_ms: f64,

    pub accuracy_attempts: u32,
    pub accuracy_time_budget_ms: f64,
    pub motion_tick_ms: f64,
    pub progress_tick_ms: f64,
    /// Horizontal target speed; applied to measured elapsed time, not per tick.
    pub target_speed_px_per_ms: f64,
    /// Upper clamp on a single motion step (background tabs throttle timers).
    pub max_motion_step_ms: f64,
    pub target_radius_px: f64,

    pub ranking_storage_key: String,
    pub home_url: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            countdown_from: 3,
            countdown_display_ms: 1000.0,
            countdown_fade_ms: 400.0,
            grid_tiles: 9,
            activation_min_ms: 1000.0,
            activation_max_ms: 2200.0,
            accuracy_attempts: 10,
            accuracy_time_budget_ms: 20_000.0,
            motion_tick_ms: 17.0,
            progress_tick_ms: 100.0,
            target_speed_px_per_ms: 0.3,
            max_motion_step_ms: 100.0,
            target_radius_px: 40.0,
            ranking_storage_key: "rankings".to_string(),
            home_url: "/".to_string(),
        }
    }
}

impl GameConfig {
    /// Parse a (possibly partial) JSON override and validate the result.
    pub fn from_json(raw: &str) -> GameResult<Self> {
        let cfg: GameConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> GameResult<()> {
        if self.countdown_from == 0 {
            return Err(GameError::Config("countdown_from must be at least 1".into()));
        }
        if self.grid_tiles == 0 {
            return Err(GameError::Config("grid_tiles must be at least 1".into()));
        }
        if !(self.activation_min_ms > 0.0 && self.activation_min_ms <= self.activation_max_ms) {
            return Err(GameError::Config(format!(
                "activation delay range {}..={} is empty or non-positive",
                self.activation_min_ms, self.activation_max_ms
            )));
        }
        if self.accuracy_attempts == 0 {
            return Err(GameError::Config("accuracy_attempts must be at least 1".into()));
        }
        let positive = [
            ("countdown_display_ms", self.countdown_display_ms),
            ("countdown_fade_ms", self.countdown_fade_ms),
            ("accuracy_time_budget_ms", self.accuracy_time_budget_ms),
            ("motion_tick_ms", self.motion_tick_ms),
            ("progress_tick_ms", self.progress_tick_ms),
            ("target_speed_px_per_ms", self.target_speed_px_per_ms),
            ("max_motion_step_ms", self.max_motion_step_ms),
            ("target_radius_px", self.target_radius_px),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(GameError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if self.ranking_storage_key.is_empty() {
            return Err(GameError::Config("ranking_storage_key must not be empty".into()));
        }
        Ok(())
    }

    /// Side length of the square reaction grid (3 for the default 9 tiles).
    pub fn grid_side(&self) -> usize {
        let mut side = 1;
        while side * side < self.grid_tiles {
            side += 1;
        }
        side
    }
}
