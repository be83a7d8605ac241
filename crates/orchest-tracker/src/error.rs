use thiserror::Error;

/// `TrackerUnavailable`: the tracker PUT/GET errored. The run controller
/// logs this and proceeds — tracker errors are not retried.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("tracker request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tracker returned status {status} for {url}")]
    Status { status: reqwest::StatusCode, url: String },
}
