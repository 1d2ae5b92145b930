use connectors::error::StoreError;
use model::records::RecordError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open input file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read input file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker #{worker}: {source}")]
    Parse {
        worker: usize,
        #[source]
        source: RecordError,
    },

    #[error("Worker #{worker} failed to open a store session: {source}")]
    OpenSession {
        worker: usize,
        #[source]
        source: StoreError,
    },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to create table {table}: {source}")]
    CreateTable {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("Pipeline task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Run cancelled before completion")]
    Cancelled,
}
