use clap::{Subcommand, ValueEnum};
use connectors::bigquery::DEFAULT_ENDPOINT;
use engine::settings::ParseErrorPolicy;
use std::fmt;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Load a newline-delimited JSON file into the destination table
    Load {
        #[arg(long, help = "Target project identifier")]
        project: String,

        #[arg(long, help = "Destination dataset")]
        dataset: String,

        #[arg(long, help = "Destination table")]
        table: String,

        #[arg(
            long,
            default_value = "./students-100.json.txt",
            help = "JSON file to be inserted"
        )]
        filepath: PathBuf,

        #[arg(
            long = "buffer-length",
            default_value_t = engine::settings::DEFAULT_BATCH_LEN,
            help = "Rows buffered per load call"
        )]
        buffer_length: usize,

        #[arg(
            long,
            default_value_t = engine::settings::DEFAULT_WORKERS,
            help = "Number of concurrent load workers"
        )]
        worker: usize,

        #[arg(
            long = "on-parse-error",
            value_enum,
            default_value_t = ParseErrorArg::Strict,
            help = "strict aborts on the first malformed line, skip drops it and continues"
        )]
        on_parse_error: ParseErrorArg,

        #[arg(
            long,
            default_value = DEFAULT_ENDPOINT,
            help = "Base URL of the table-store REST endpoint"
        )]
        endpoint: String,
    },
    /// Generate a sample newline-delimited JSON input file
    Gen {
        #[arg(long, default_value_t = 100, help = "Number of rows to generate")]
        rows: u64,

        #[arg(long, default_value = "./students-100.json.txt", help = "Output path")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ParseErrorArg {
    Strict,
    Skip,
}

impl From<ParseErrorArg> for ParseErrorPolicy {
    fn from(arg: ParseErrorArg) -> Self {
        match arg {
            ParseErrorArg::Strict => ParseErrorPolicy::Strict,
            ParseErrorArg::Skip => ParseErrorPolicy::Skip,
        }
    }
}

// default_value_t renders the default through Display.
impl fmt::Display for ParseErrorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseErrorArg::Strict => "strict",
            ParseErrorArg::Skip => "skip",
        })
    }
}
