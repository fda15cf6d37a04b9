use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{path} is missing required column \"{column}\"")]
    MissingColumn { path: String, column: &'static str },

    #[error("{path}, row {row}: {message}")]
    InvalidRow {
        path: String,
        row: usize,
        message: String,
    },

    #[error("game feed {game_pk}: {message}")]
    Feed { game_pk: u64, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
