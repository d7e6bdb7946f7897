// Kobold Core Library
// Validated client adapter for KoboldCpp-compatible text generation servers

pub mod llm;

// Export core types
pub use llm::{
    clean_url, GenerateRequest, KoboldClient, KoboldConfig, KoboldSettings, Scalar,
};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KoboldError {
    /// The request never completed or the server answered with a non-success status.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A successful response without `results[0].text`; carries the raw body.
    #[error("Unexpected response format from KoboldCpp API: {0}")]
    Format(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
pub type Result<T> = std::result::Result<T, KoboldError>;
