use crate::{
    batcher::Batcher,
    error::{PipelineError, WorkerError},
    metrics::{Metrics, MetricsSnapshot},
    retry::{RetryError, RetryPolicy, classify_store_error},
    settings::LoadSettings,
    source::LineSource,
    worker::LoadWorker,
};
use connectors::store::{CreateOutcome, StoreSession, TableStore};
use model::{
    records::{Batch, RawRecord},
    table::TableSchema,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Aggregate outcome of one load run.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub lines_read: u64,
    pub batches_emitted: u64,
    pub metrics: MetricsSnapshot,
    pub elapsed: Duration,
}

/// Wires source, batcher, and worker pool together and tracks completion.
///
/// A run moves through table creation, concurrent streaming, and draining;
/// it is done only when every worker has exited.
pub struct Pipeline {
    settings: LoadSettings,
    store: Arc<dyn TableStore>,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(settings: LoadSettings, store: Arc<dyn TableStore>) -> Self {
        Pipeline {
            settings,
            store,
            retry: RetryPolicy::for_store(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();

        self.ensure_table().await?;
        let sessions = self.open_sessions().await?;

        let metrics = Metrics::new();
        let (raw_tx, raw_rx) = mpsc::channel::<RawRecord>(self.settings.channel_capacity);
        let (batch_tx, batch_rx) = async_channel::bounded::<Batch>(self.settings.channel_capacity);

        let source = LineSource::new(&self.settings.filepath);
        let source_task = tokio::spawn(source.run(raw_tx, cancel.clone()));

        info!(batch_len = self.settings.batch_len, "Buffering rows");
        let batcher_task = tokio::spawn(Batcher::new(self.settings.batch_len).run(raw_rx, batch_tx));

        info!(workers = self.settings.workers, "Consuming rows");
        let mut worker_tasks = Vec::with_capacity(self.settings.workers);
        for (id, session) in sessions.into_iter().enumerate() {
            let worker = LoadWorker::new(
                id,
                self.settings.table.clone(),
                self.settings.parse_errors,
                self.retry.clone(),
                metrics.clone(),
            );
            worker_tasks.push(tokio::spawn(worker.run(
                batch_rx.clone(),
                session,
                cancel.clone(),
            )));
        }
        drop(batch_rx);

        // Source closing its channel starts the drain; every queue empties in
        // turn and each worker exits once its receive side reports closed.
        let source_result = source_task.await?;
        let batches_emitted = batcher_task.await?;
        let mut worker_error = None;
        for task in worker_tasks {
            if let Err(err) = task.await? {
                worker_error.get_or_insert(err);
            }
        }

        let lines_read = source_result?;
        if let Some(err) = worker_error {
            return Err(err.into());
        }
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let summary = RunSummary {
            lines_read,
            batches_emitted,
            metrics: metrics.snapshot(),
            elapsed: start.elapsed(),
        };
        info!(
            lines = summary.lines_read,
            batches = summary.batches_emitted,
            rows_loaded = summary.metrics.rows_loaded,
            batches_dropped = summary.metrics.batches_dropped,
            parse_skips = summary.metrics.parse_skips,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Done"
        );
        Ok(summary)
    }

    /// Table creation must complete before any record is consumed. An
    /// existing table is success; any other failure aborts the run here,
    /// before the pipeline starts.
    async fn ensure_table(&self) -> Result<(), PipelineError> {
        let table = &self.settings.table;
        let schema = TableSchema::user_records();
        let schema_ref = &schema;
        let store = self.store.as_ref();
        info!(table = %table, "Creating table");

        let outcome = self
            .retry
            .run(
                || async move { store.create_table(table, schema_ref).await },
                classify_store_error,
            )
            .await;
        match outcome {
            Ok(CreateOutcome::Created) => info!(table = %table, "Table created"),
            Ok(CreateOutcome::AlreadyExists) => {
                info!(table = %table, "Table already exists, not created")
            }
            Err(RetryError::Fatal(source)) | Err(RetryError::AttemptsExceeded(source)) => {
                return Err(PipelineError::CreateTable {
                    table: table.to_string(),
                    source,
                });
            }
        }
        Ok(())
    }

    /// Sessions are opened up front so a connection problem aborts the run
    /// before anything is spawned or read.
    async fn open_sessions(&self) -> Result<Vec<Box<dyn StoreSession>>, PipelineError> {
        let mut sessions = Vec::with_capacity(self.settings.workers);
        for worker in 0..self.settings.workers {
            let session = self
                .store
                .open_session()
                .await
                .map_err(|source| WorkerError::OpenSession { worker, source })?;
            sessions.push(session);
        }
        Ok(sessions)
    }
}
