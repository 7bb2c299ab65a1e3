//! Error handling module for the Mynofi updater.
//!
//! Every external-call boundary (function call, download, socket, spawn) reports
//! failures through [`AppError`] so callers can tell "no update" apart from
//! "check failed".

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const REMOTE_ERROR: &str = "REMOTE_ERROR";
    pub const DECODE_ERROR: &str = "DECODE_ERROR";
    pub const REALTIME_ERROR: &str = "REALTIME_ERROR";
    pub const DOWNLOAD_ERROR: &str = "DOWNLOAD_ERROR";
    pub const IO_ERROR: &str = "IO_ERROR";
    pub const INSTALL_ERROR: &str = "INSTALL_ERROR";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Invalid or missing configuration
    Config(String),
    /// Transport failure talking to the backend
    Network(String),
    /// The function endpoint answered with a non-success status
    Remote { status: u16, message: String },
    /// A body or frame could not be decoded
    Decode(String),
    /// Real-time socket failure
    Realtime(String),
    /// Installer download answered with something other than 200
    Download { status: u16 },
    /// Local filesystem failure
    Io(String),
    /// Installer could not be launched
    Install(String),
}

impl AppError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => codes::CONFIG_ERROR,
            AppError::Network(_) => codes::NETWORK_ERROR,
            AppError::Remote { .. } => codes::REMOTE_ERROR,
            AppError::Decode(_) => codes::DECODE_ERROR,
            AppError::Realtime(_) => codes::REALTIME_ERROR,
            AppError::Download { .. } => codes::DOWNLOAD_ERROR,
            AppError::Io(_) => codes::IO_ERROR,
            AppError::Install(_) => codes::INSTALL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Config(msg) => msg.clone(),
            AppError::Network(msg) => msg.clone(),
            AppError::Remote { status, message } => format!("HTTP {}: {}", status, message),
            AppError::Decode(msg) => msg.clone(),
            AppError::Realtime(msg) => msg.clone(),
            AppError::Download { status } => format!("HTTP {}", status),
            AppError::Io(msg) => msg.clone(),
            AppError::Install(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::debug!("HTTP error: {:?}", err);
        if err.is_decode() {
            AppError::Decode(format!("Response body error: {}", err))
        } else {
            AppError::Network(format!("HTTP error: {}", err))
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!("JSON error: {:?}", err);
        AppError::Decode(format!("JSON error: {}", err))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for AppError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        tracing::debug!("WebSocket error: {:?}", err);
        AppError::Realtime(format!("WebSocket error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::debug!("IO error: {:?}", err);
        AppError::Io(format!("IO error: {}", err))
    }
}

/// Remote error body returned by edge functions (`{"error": "..."}`).
#[derive(Debug, serde::Deserialize)]
pub struct FunctionErrorBody {
    #[serde(alias = "message", alias = "msg")]
    pub error: String,
}

impl FunctionErrorBody {
    /// Best-effort extraction of a readable message from a non-success body.
    pub fn message_from(body: &str) -> String {
        match serde_json::from_str::<FunctionErrorBody>(body) {
            Ok(parsed) => parsed.error,
            Err(_) if body.trim().is_empty() => "empty response body".to_string(),
            Err(_) => body.trim().to_string(),
        }
    }
}
