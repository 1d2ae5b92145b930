use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Store rejected the request with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Store rejected {rejected} of {total} rows: {detail}")]
    RowsRejected {
        rejected: usize,
        total: usize,
        detail: String,
    },

    #[error("Unexpected store error: {0}")]
    Unexpected(String),
}

impl StoreError {
    /// Whether a retry of the same call could plausibly succeed.
    ///
    /// Timeouts, connection failures, throttling, and server-side errors are
    /// transient; rejected rows and other client errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Transport(err) => err.is_timeout() || err.is_connect(),
            StoreError::Api { status, .. } => matches!(*status, 429 | 500 | 502 | 503 | 504),
            StoreError::RowsRejected { .. } => false,
            StoreError::Unexpected(_) => false,
        }
    }
}
