//! Reaction mode: tiles light up one at a time and must be clicked quickly.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};

/// One activation and (once clicked) its response time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReactionSample {
    pub tile_index: usize,
    pub activated_at: f64,
    pub clicked_at: Option<f64>,
}

impl ReactionSample {
    pub fn reaction_ms(&self) -> Option<f64> {
        self.clicked_at.map(|c| c - self.activated_at)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileState {
    Waiting,
    Active,
    Cleared,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TileClick {
    Cleared { reaction_ms: f64 },
    Completed { reaction_ms: f64, average_ms: f64 },
}

#[derive(Clone, Debug)]
pub struct ReactionEngine {
    cleared: Vec<bool>,
    active: Option<usize>,
    samples: Vec<ReactionSample>,
    latest_ms: Option<f64>,
    min_delay_ms: f64,
    max_delay_ms: f64,
}

impl ReactionEngine {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            cleared: vec![false; config.grid_tiles],
            active: None,
            samples: Vec::with_capacity(config.grid_tiles),
            latest_ms: None,
            min_delay_ms: config.activation_min_ms,
            max_delay_ms: config.activation_max_ms,
        }
    }

    /// Reset the grid and return the delay before the first activation.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        self.cleared.iter_mut().for_each(|c| *c = false);
        self.active = None;
        self.samples.clear();
        self.latest_ms = None;
        self.next_delay(rng)
    }

    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.min_delay_ms..=self.max_delay_ms)
    }

    /// Light up a random uncleared tile. Returns `None` once every tile is cleared.
    ///
    /// A previous activation that was never clicked is superseded; its sample
    /// stays without a click time and does not count toward the average.
    pub fn activate<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Option<usize> {
        let available: Vec<usize> = self
            .cleared
            .iter()
            .enumerate()
            .filter(|(_, cleared)| !**cleared)
            .map(|(i, _)| i)
            .collect();
        let idx = *available.choose(rng)?;
        self.active = Some(idx);
        self.samples.push(ReactionSample { tile_index: idx, activated_at: now, clicked_at: None });
        debug!(tile = idx, remaining = available.len(), "tile activated");
        Some(idx)
    }

    /// Handle a click on tile `index`. Anything but the active tile is fatal.
    pub fn click(&mut self, index: usize, now: f64) -> GameResult<TileClick> {
        let active = self.active;
        if active != Some(index) {
            return Err(GameError::WrongTile { index, active });
        }
        let sample = self
            .samples
            .last_mut()
            .filter(|s| s.tile_index == index && s.clicked_at.is_none())
            .ok_or(GameError::WrongTile { index, active })?;
        sample.clicked_at = Some(now);
        let reaction_ms = now - sample.activated_at;

        self.cleared[index] = true;
        self.active = None;
        self.latest_ms = Some(reaction_ms);
        debug!(tile = index, reaction_ms, "tile cleared");

        if self.is_complete() {
            let average_ms = self.average_ms().unwrap_or(reaction_ms);
            Ok(TileClick::Completed { reaction_ms, average_ms })
        } else {
            Ok(TileClick::Cleared { reaction_ms })
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cleared.iter().all(|c| *c)
    }

    /// Mean over clicked samples, `None` before the first click.
    pub fn average_ms(&self) -> Option<f64> {
        let times: Vec<f64> = self.samples.iter().filter_map(ReactionSample::reaction_ms).collect();
        if times.is_empty() {
            None
        } else {
            Some(times.iter().sum::<f64>() / times.len() as f64)
        }
    }

    pub fn tile_state(&self, index: usize) -> TileState {
        if self.cleared.get(index).copied().unwrap_or(false) {
            TileState::Cleared
        } else if self.active == Some(index) {
            TileState::Active
        } else {
            TileState::Waiting
        }
    }

    pub fn tile_count(&self) -> usize {
        self.cleared.len()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn samples(&self) -> &[ReactionSample] {
        &self.samples
    }

    pub fn latest_reaction_ms(&self) -> Option<f64> {
        self.latest_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn engine() -> (ReactionEngine, StdRng) {
        (ReactionEngine::new(&GameConfig::default()), StdRng::seed_from_u64(7))
    }

    #[test]
    fn start_delay_is_within_configured_range() {
        let (mut eng, mut rng) = engine();
        for _ in 0..200 {
            let d = eng.start(&mut rng);
            assert!((1000.0..=2200.0).contains(&d), "delay {d}");
        }
    }

    #[test]
    fn activation_never_picks_a_cleared_tile() {
        let (mut eng, mut rng) = engine();
        eng.start(&mut rng);
        let mut now = 0.0;
        for _ in 0..9 {
            let idx = eng.activate(now, &mut rng).unwrap();
            assert_eq!(eng.tile_state(idx), TileState::Active);
            now += 100.0;
            eng.click(idx, now).unwrap();
            assert_eq!(eng.tile_state(idx), TileState::Cleared);
        }
        assert!(eng.is_complete());
        assert_eq!(eng.activate(now, &mut rng), None);
    }

    #[test]
    fn clicking_without_active_tile_fails() {
        let (mut eng, mut rng) = engine();
        eng.start(&mut rng);
        let err = eng.click(0, 10.0).unwrap_err();
        assert!(matches!(err, GameError::WrongTile { index: 0, active: None }));
    }

    #[test]
    fn clicking_a_cleared_tile_fails() {
        let (mut eng, mut rng) = engine();
        eng.start(&mut rng);
        let first = eng.activate(0.0, &mut rng).unwrap();
        eng.click(first, 200.0).unwrap();
        let second = eng.activate(1500.0, &mut rng).unwrap();
        assert_ne!(first, second);
        let err = eng.click(first, 1600.0).unwrap_err();
        assert!(matches!(err, GameError::WrongTile { active: Some(a), .. } if a == second));
    }

    #[test]
    fn superseded_activation_is_excluded_from_average() {
        let (mut eng, mut rng) = engine();
        eng.start(&mut rng);
        eng.activate(0.0, &mut rng).unwrap();
        let idx = eng.activate(1000.0, &mut rng).unwrap();
        let out = eng.click(idx, 1250.0).unwrap();
        assert_eq!(out, TileClick::Cleared { reaction_ms: 250.0 });
        assert_eq!(eng.samples().len(), 2);
        assert_eq!(eng.average_ms(), Some(250.0));
        assert_eq!(eng.latest_reaction_ms(), Some(250.0));
    }
}
