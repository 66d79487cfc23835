pub mod clip;
pub mod client;
pub mod clipboard;
pub mod server;
pub mod store;
pub mod sync;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipSyncError {
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("File operation error: {0}")]
    FileOperation(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageProcessing(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Server error: {0}")]
    Server(String),
}

impl From<reqwest::Error> for ClipSyncError {
    fn from(e: reqwest::Error) -> Self {
        ClipSyncError::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClipSyncError>;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const HTTP_TIMEOUT_SECS: u64 = 2;
pub const MAX_BODY_SIZE: usize = 32 * 1024 * 1024; // 32MB
