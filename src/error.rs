use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrawlError>;

/// Failures a single unit of crawl work can hit. None of these abort a run;
/// the pipeline logs them and abandons the unit.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not read result count: {0}")]
    BadPageCount(String),

    #[error("expected element `{0}` is missing")]
    MissingElement(&'static str),

    #[error("{0} has no parsed content")]
    NotParsed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    pub fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        CrawlError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Transport-class failures are the ones followed by the fixed backoff.
    pub fn is_transport(&self) -> bool {
        matches!(self, CrawlError::Transport { .. } | CrawlError::Status { .. })
    }
}

// ── Tests ──
