use thiserror::Error;

/// Terminal failures of a scrub. Anything that goes wrong after the page
/// was fetched is absorbed into a missing field instead.
#[derive(Debug, Error)]
pub enum ScrubError {
    #[error("URL is required.")]
    MissingUrl,
    #[error("Enter a valid URL.")]
    InvalidUrl,
    #[error("Unable to reach {domain}")]
    Unreachable { domain: String },
    #[error("The website took too long to respond.")]
    Timeout,
    #[error("Unable to scrub that profile right now.")]
    Fetch(#[source] reqwest::Error),
}

impl ScrubError {
    pub fn is_input_error(&self) -> bool {
        matches!(self, ScrubError::MissingUrl | ScrubError::InvalidUrl)
    }
}

impl From<reqwest::Error> for ScrubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScrubError::Timeout
        } else {
            ScrubError::Fetch(err)
        }
    }
}
