use thiserror::Error;

/// Errors that can occur while building or querying a project IR.
#[derive(Error, Debug)]
pub enum AirError {
    #[error("file error: {message} (path: {path})")]
    File { message: String, path: String },

    #[error("parse error: {message} (path: {path}, line: {line:?})")]
    Parse {
        message: String,
        path: String,
        line: Option<u32>,
    },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("dependencies already finalized (operation: {operation})")]
    DependenciesFinalized { operation: String },

    #[error("dependencies not finalized (operation: {operation})")]
    DependenciesNotFinalized { operation: String },

    #[error("unknown unit: {uid}")]
    UnknownUnit { uid: String },

    #[error("invalid dependency: {message}")]
    InvalidDependency { message: String },

    #[error("invalid symbol '{name}': {message}")]
    InvalidSymbol { name: String, message: String },

    #[error("request contains no valid needs")]
    EmptyRequest,

    #[error("analyzer error: {message} (language: {language})")]
    Analyzer { message: String, language: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AirError {
    /// Builds a `Parse` error for an in-memory document at a 1-based line.
    pub fn parse_at(path: &str, line: usize, message: impl Into<String>) -> Self {
        AirError::Parse {
            message: message.into(),
            path: path.to_string(),
            line: Some(line as u32),
        }
    }
}

/// Convenience alias for results using `AirError`.
pub type Result<T> = std::result::Result<T, AirError>;
