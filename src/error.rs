use thiserror::Error;

/// Comprehensive error type for the pulseboard dashboard core
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Initialization failure: {0}")]
    Initialization(String),

    #[error("Fetch failure: {0}")]
    Fetch(String),

    #[error("Subscription failure: {0}")]
    Subscription(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dashboard has been torn down")]
    TornDown,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Async task error: {0}")]
    AsyncTask(#[from] tokio::task::JoinError),
}

impl DashboardError {
    /// Create an initialization failure error
    pub fn initialization<S: Into<String>>(msg: S) -> Self {
        Self::Initialization(msg.into())
    }

    /// Create a fetch failure error
    pub fn fetch<S: Into<String>>(msg: S) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a subscription failure error
    pub fn subscription<S: Into<String>>(msg: S) -> Self {
        Self::Subscription(msg.into())
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Check if this error can be resolved by a manual retry
    ///
    /// The core never retries automatically; this only informs whether
    /// the error state should offer a retry control.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_) | Self::Subscription(_) | Self::Io(_) | Self::AsyncTask(_)
        )
    }

    /// Get user-facing error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::Initialization(msg) => {
                format!(
                    "The analytics service could not be reached at startup: {}. Check connectivity and reload the dashboard.",
                    msg
                )
            }
            Self::Fetch(msg) => {
                format!(
                    "Failed to refresh dashboard data: {}. The last loaded data is still shown; use the refresh control to retry.",
                    msg
                )
            }
            Self::Subscription(msg) => {
                format!(
                    "Live event feed unavailable: {}. The dashboard will continue with periodic refresh only.",
                    msg
                )
            }
            Self::TornDown => "This dashboard view has been closed.".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Convenient result type for the dashboard core
pub type Result<T> = std::result::Result<T, DashboardError>;
