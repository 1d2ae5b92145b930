use model::table::TableRef;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_BATCH_LEN: usize = 4;
pub const DEFAULT_WORKERS: usize = 4;

/// Capacity of both hand-off queues. Bounded so a slow store propagates
/// backpressure up to the file read rate.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// How the pipeline treats a line that fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseErrorPolicy {
    /// Abort the whole run on the first malformed line.
    #[default]
    Strict,
    /// Log the line, count it, and continue with the rest.
    Skip,
}

/// Immutable run configuration, built once at startup and passed into every
/// pipeline component.
#[derive(Debug, Clone)]
pub struct LoadSettings {
    pub table: TableRef,
    pub filepath: PathBuf,
    pub batch_len: usize,
    pub workers: usize,
    pub parse_errors: ParseErrorPolicy,
    pub channel_capacity: usize,
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Batch length must be a positive integer")]
    ZeroBatchLen,

    #[error("Worker count must be a positive integer")]
    ZeroWorkers,
}

impl LoadSettings {
    /// A batch length of 1 degenerates to per-record load calls; there is no
    /// separate unbatched pipeline.
    pub fn new(
        table: TableRef,
        filepath: impl Into<PathBuf>,
        batch_len: usize,
        workers: usize,
        parse_errors: ParseErrorPolicy,
    ) -> Result<Self, SettingsError> {
        if batch_len == 0 {
            return Err(SettingsError::ZeroBatchLen);
        }
        if workers == 0 {
            return Err(SettingsError::ZeroWorkers);
        }
        Ok(LoadSettings {
            table,
            filepath: filepath.into(),
            batch_len,
            workers,
            parse_errors,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        })
    }
}
