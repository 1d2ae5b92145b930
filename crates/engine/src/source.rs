use crate::error::SourceError;
use model::records::RawRecord;
use std::path::PathBuf;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Streams trimmed lines from a file into the raw-record channel.
///
/// One line is materialized at a time; the file is never buffered whole.
/// A full channel suspends the scan, propagating backpressure to the read
/// rate.
pub struct LineSource {
    path: PathBuf,
}

impl LineSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LineSource { path: path.into() }
    }

    /// Reads until end-of-file, cancellation, or a closed downstream.
    /// Dropping the sender on return signals end-of-input. Returns the number
    /// of lines read; a mid-stream read error fails the run.
    pub async fn run(
        self,
        tx: mpsc::Sender<RawRecord>,
        cancel: CancellationToken,
    ) -> Result<u64, SourceError> {
        let file = File::open(&self.path).await.map_err(|source| SourceError::Open {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "Reading file");

        let mut lines = BufReader::new(file).lines();
        let mut count = 0u64;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = lines.next_line() => next.map_err(|source| SourceError::Read {
                    path: self.path.clone(),
                    source,
                })?,
            };
            let Some(line) = next else { break };
            let record = RawRecord::from(line.trim().to_string());
            let delivered = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                delivered = tx.send(record) => delivered.is_ok(),
            };
            if !delivered {
                // Downstream is gone; the run is already winding down.
                break;
            }
            count += 1;
        }

        info!(rows = count, "Finished reading input");
        Ok(count)
    }
}
