//! Error types for the performance tooling.

use thiserror::Error;

use crate::config::describe_env_var;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// One or more required environment variables are unset
    #[error("{}", missing_env_message(.0))]
    MissingEnv(Vec<String>),

    /// Chart rendering errors
    #[error("Rendering error: {0}")]
    Render(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Http(format!("request timeout: {e}"))
        } else if e.is_connect() {
            Error::Http(format!("connection error: {e}"))
        } else {
            Error::Http(e.to_string())
        }
    }
}

fn missing_env_message(vars: &[String]) -> String {
    let mut msg = String::from("Missing required environment variables:\n");
    for var in vars {
        msg.push_str(&format!("  {} - {}\n", var, describe_env_var(var)));
    }
    msg.push_str("\nExample:\n");
    msg.push_str("  export OPENSEARCH_ENDPOINT=https://your-cluster.region.es.amazonaws.com\n");
    msg.push_str("  export OPENSEARCH_USER=admin\n");
    msg.push_str("  export OPENSEARCH_PASSWORD='your-password'\n");
    msg.push_str("  export INDEX_NAME=my_logs_index");
    msg
}
