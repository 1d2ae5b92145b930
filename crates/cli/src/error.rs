use connectors::error::StoreError;
use engine::error::PipelineError;
use engine::settings::SettingsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to build the store client: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Failed to write sample file: {0}")]
    SampleFile(#[from] std::io::Error),
}
