//! Reaction Lab core crate.
//!
//! Two browser mini-games share one session state machine: a 3x3 reaction grid
//! and a moving-target accuracy test. Gameplay lives in `game` and is plain Rust
//! driven by explicit timestamps; `web` wires it to the DOM, canvas and browser
//! timers and is the only part that needs a real browser.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
pub mod game;
pub mod logging;
pub mod ranking;
mod web;

pub use config::GameConfig;
pub use error::{GameError, GameResult};
pub use game::{Effect, Input, Mode, Outcome, Phase, Session, TimerSlot, Viewport};
pub use ranking::{LocalStorageRankingStore, MemoryRankingStore, RankingEntry, RankingStore};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    let level = if cfg!(debug_assertions) {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    logging::init(level);
}

// -----------------------------------------------------------------------------
// Entrypoints
// -----------------------------------------------------------------------------

/// Build the page and show the idle screen with default settings.
#[wasm_bindgen]
pub fn start_app() -> Result<(), JsValue> {
    web::start(GameConfig::default())
}

/// Same as `start_app`, with a partial JSON `GameConfig` override.
#[wasm_bindgen]
pub fn start_app_with_config(config_json: &str) -> Result<(), JsValue> {
    let config = GameConfig::from_json(config_json)?;
    web::start(config)
}
