use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Stale element: {0}")]
    StaleElement(String),

    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Page shows an error message")]
    ErrorBanner,

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    /// Timing-related failures that are worth retrying on the same page.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScanError::Timeout(_) | ScanError::StaleElement(_) | ScanError::ErrorBanner
        )
    }

    /// The element simply is not on the page (or never showed up).
    pub fn is_absence(&self) -> bool {
        matches!(self, ScanError::Timeout(_) | ScanError::NotFound(_))
    }
}

impl From<chromiumoxide::error::CdpError> for ScanError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        use chromiumoxide::error::CdpError;

        if let CdpError::Timeout = err {
            return ScanError::Timeout("browser response".to_string());
        }

        let message = err.to_string();
        let lowered = message.to_lowercase();
        // CDP reports detached nodes through these messages
        if lowered.contains("node with given id")
            || lowered.contains("does not belong to the document")
            || lowered.contains("stale")
        {
            ScanError::StaleElement(message)
        } else if lowered.contains("not found") {
            ScanError::NotFound(message)
        } else {
            ScanError::Browser(message)
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
