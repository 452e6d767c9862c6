use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("Backend not available: {0}")]
    BackendUnavailable(String),

    #[error("{backend} failed: {message}")]
    BackendFailed { backend: String, message: String },

    #[error("Invalid synthesis request: {0}")]
    InvalidRequest(String),

    #[error("Unknown backend: {0}. Expected one of: edge-tts, gtts")]
    UnknownBackend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TtsError>;
