use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Engine-level errors.
///
/// Trading decisions never surface here; only setup and roster problems do.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No agents registered, initialise the roster before stepping")]
    NoAgents,

    #[error("Roster is sealed after day {day}, agents must be added before the first step")]
    RosterSealed { day: u64 },

    #[error("Consortium {0} has no members")]
    EmptyConsortium(String),

    #[error("Agent id {0} is already registered")]
    DuplicateAgentId(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
