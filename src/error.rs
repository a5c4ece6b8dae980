use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("an identifier is required before starting the reaction test")]
    MissingIdentifier,

    #[error("wrong tile clicked: {index} (active: {active:?})")]
    WrongTile { index: usize, active: Option<usize> },

    #[error("time is up after {elapsed_ms:.0}ms")]
    Timeout { elapsed_ms: f64 },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Storage Error: {0}")]
    Storage(String),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GameResult<T> = Result<T, GameError>;

impl GameError {
    /// Fatal errors end the run: all session state is discarded.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GameError::WrongTile { .. } | GameError::Timeout { .. })
    }

    /// Text for the blocking alert shown to the player.
    pub fn user_message(&self) -> String {
        match self {
            GameError::MissingIdentifier => "Please enter an ID.".to_string(),
            GameError::WrongTile { .. } => "Wrong tile selected.".to_string(),
            GameError::Timeout { .. } => "Time is up! Returning home.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<GameError> for JsValue {
    fn from(err: GameError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}
