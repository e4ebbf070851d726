use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No input paths specified in job")]
    NoInputPaths,

    #[error("Input path does not exist: {0}")]
    InputPathNotFound(String),

    #[error("Input Pattern {0} matches 0 files")]
    InputPatternNoMatches(String),

    /// Every path problem found while listing, reported together.
    #[error("{}", join_messages(.0))]
    InvalidInput(Vec<Error>),

    #[error("Offset {offset} is outside of file (0..{last_byte})")]
    OffsetOutOfRange { offset: u64, last_byte: i64 },

    #[error("Split at offset {offset} with length {length} runs past the last block")]
    SplitBeyondBlocks { offset: u64, length: u64 },

    #[error("Not a file (dir): {0}")]
    NotAFile(String),

    #[error("Split planning worker panicked")]
    WorkerPanicked,

    #[error("Invalid path pattern")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse configuration file")]
    ConfigFile(#[from] toml::de::Error),

    #[error("Failed to read configuration from environment")]
    Env(#[from] envy::Error),

    #[error("Failed to encode or decode splits")]
    Encoding(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    /// The individual errors carried by this one. A composite yields its
    /// members, anything else yields itself.
    pub fn causes(&self) -> Vec<&Error> {
        match self {
            Error::InvalidInput(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }
}
