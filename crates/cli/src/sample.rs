//! Sample-data generator for load testing.

use rand::Rng;
use serde_json::json;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};
use tracing::info;

const NAMES: &[&str] = &["aaa", "bbb", "ccc"];

/// Writes `rows` newline-delimited `{id, name}` records to `path`,
/// overwriting any existing file.
pub fn write_sample_file(path: &Path, rows: u64) -> std::io::Result<()> {
    let mut rng = rand::thread_rng();
    let mut out = BufWriter::new(File::create(path)?);
    for id in 0..rows {
        let name = NAMES[rng.gen_range(0..NAMES.len())];
        let record = json!({"id": id, "name": name});
        writeln!(out, "{record}")?;
    }
    out.flush()?;
    info!(rows, path = %path.display(), "Sample file written");
    Ok(())
}
