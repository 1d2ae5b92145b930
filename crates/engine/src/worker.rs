use crate::{
    error::WorkerError,
    metrics::Metrics,
    retry::{RetryDisposition, RetryPolicy, classify_store_error},
    settings::ParseErrorPolicy,
};
use connectors::store::StoreSession;
use model::{
    records::{Batch, UserRecord},
    table::TableRef,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One member of the load pool. Owns a single store session for its whole
/// lifetime and processes batches in the order it receives them.
pub struct LoadWorker {
    id: usize,
    table: TableRef,
    parse_errors: ParseErrorPolicy,
    retry: RetryPolicy,
    metrics: Metrics,
}

impl LoadWorker {
    pub fn new(
        id: usize,
        table: TableRef,
        parse_errors: ParseErrorPolicy,
        retry: RetryPolicy,
        metrics: Metrics,
    ) -> Self {
        LoadWorker {
            id,
            table,
            parse_errors,
            retry,
            metrics,
        }
    }

    /// Consumes batches until the channel is closed and drained or the run is
    /// cancelled, then closes the session. A fatal error cancels the rest of
    /// the pipeline before it is returned.
    pub async fn run(
        self,
        rx: async_channel::Receiver<Batch>,
        session: Box<dyn StoreSession>,
        cancel: CancellationToken,
    ) -> Result<(), WorkerError> {
        let result = self.consume(&rx, session.as_ref(), &cancel).await;
        drop(rx);

        if let Err(err) = session.close().await {
            warn!(worker = self.id, error = %err, "Failed to close store session");
        }
        debug!(worker = self.id, "Worker exited");

        if result.is_err() {
            cancel.cancel();
        }
        result
    }

    async fn consume(
        &self,
        rx: &async_channel::Receiver<Batch>,
        session: &dyn StoreSession,
        cancel: &CancellationToken,
    ) -> Result<(), WorkerError> {
        loop {
            let batch = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                received = rx.recv() => match received {
                    Ok(batch) => batch,
                    // Closed and drained: normal termination.
                    Err(_) => return Ok(()),
                },
            };
            self.load_batch(session, batch).await?;
        }
    }

    async fn load_batch(&self, session: &dyn StoreSession, batch: Batch) -> Result<(), WorkerError> {
        let mut rows = Vec::with_capacity(batch.len());
        for raw in &batch.rows {
            match UserRecord::parse(raw) {
                Ok(row) => rows.push(row),
                Err(source) => match self.parse_errors {
                    ParseErrorPolicy::Strict => {
                        return Err(WorkerError::Parse {
                            worker: self.id,
                            source,
                        });
                    }
                    ParseErrorPolicy::Skip => {
                        warn!(worker = self.id, error = %source, "Skipping malformed record");
                        self.metrics.increment_parse_skips(1);
                    }
                },
            }
        }
        if rows.is_empty() {
            return Ok(());
        }

        let table = &self.table;
        let rows_ref = rows.as_slice();
        let outcome = self
            .retry
            .run(
                || async move { session.insert_rows(table, rows_ref).await },
                |err| {
                    let disposition = classify_store_error(err);
                    if disposition == RetryDisposition::Retry {
                        self.metrics.increment_transient_errors(1);
                        warn!(
                            worker = self.id,
                            batch = batch.seq,
                            error = %err,
                            "Transient store error"
                        );
                    }
                    disposition
                },
            )
            .await;

        match outcome {
            Ok(()) => {
                self.metrics.increment_batches_loaded(1);
                self.metrics.increment_rows_loaded(rows.len() as u64);
                info!(
                    worker = self.id,
                    batch = batch.seq,
                    rows = rows.len(),
                    "Inserted rows"
                );
                debug!(worker = self.id, batch = batch.seq, content = ?rows, "Inserted content");
            }
            // Best-effort policy: a failed batch is dropped and counted, never
            // escalated to kill the run.
            Err(err) => {
                self.metrics.increment_batches_dropped(1);
                self.metrics.increment_rows_dropped(rows.len() as u64);
                warn!(
                    worker = self.id,
                    batch = batch.seq,
                    rows = rows.len(),
                    error = %err.into_inner(),
                    "Dropping batch after failed load"
                );
            }
        }
        Ok(())
    }
}
