use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

/// Failures surfaced by the wiki collaborators and the run configuration.
#[derive(Debug, Error)]
pub enum BotError {
    /// Required settings are missing or malformed. Fatal before any processing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The page has no interwiki link to the requested language.
    #[error("no {target} interwiki link for {title}")]
    InterwikiNotFound { title: String, target: String },

    /// The page does not exist on the site.
    #[error("page not found: {0}")]
    PageNotFound(String),

    /// Transport or API-level failure.
    #[error("API error: {0}")]
    Api(String),

    /// The site rejected an edit (conflict, protection, permissions).
    #[error("edit rejected for {title}: {reason}")]
    Edit { title: String, reason: String },
}

impl BotError {
    /// Expected outcomes that only cause a skip, never a warning.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            Self::InterwikiNotFound { .. } | Self::PageNotFound(_)
        )
    }
}

impl From<anyhow::Error> for BotError {
    fn from(error: anyhow::Error) -> Self {
        Self::Api(format!("{error:#}"))
    }
}
