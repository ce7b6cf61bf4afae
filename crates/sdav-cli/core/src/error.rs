use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdavError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid settings file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("command failed: {0}")]
    Command(String),

    #[error("unknown server group '{0}'")]
    UnknownGroup(String),

    #[error("unknown virtual machine '{0}', run `sdav info vms` to list them")]
    UnknownVm(String),

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl From<String> for SdavError {
    fn from(message: String) -> Self {
        SdavError::Config(message)
    }
}

impl From<&str> for SdavError {
    fn from(message: &str) -> Self {
        SdavError::Config(message.to_string())
    }
}

/// Why a single node query did not produce a version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("connection timed out")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("{0}")]
    Other(String),
}

impl QueryError {
    /// Text shown in the version column in place of the version.
    pub fn placeholder(&self) -> &'static str {
        match self {
            QueryError::Timeout => "The server is down",
            QueryError::ConnectionRefused => "Can't connect to the server",
            QueryError::Other(_) => "Unknown error",
        }
    }
}
