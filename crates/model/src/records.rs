use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One unparsed line of input text, presumed to hold a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord(String);

impl RawRecord {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RawRecord {
    fn from(line: String) -> Self {
        RawRecord(line)
    }
}

impl From<&str> for RawRecord {
    fn from(line: &str) -> Self {
        RawRecord(line.to_string())
    }
}

/// A validated record with the fixed two-field shape the destination table
/// expects. Fields beyond `id` and `name` are ignored; a missing or mistyped
/// field is a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
}

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Malformed record {line:?}: {source}")]
    Malformed {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

impl UserRecord {
    /// Decodes one raw line. Pure and stateless; the caller decides whether a
    /// failure is fatal or skippable.
    pub fn parse(raw: &RawRecord) -> Result<Self, RecordError> {
        serde_json::from_str(raw.as_str()).map_err(|source| RecordError::Malformed {
            line: raw.as_str().to_string(),
            source,
        })
    }
}

/// An ordered group of raw records handed to one worker as a single load call.
#[derive(Debug, Clone)]
pub struct Batch {
    pub seq: u64,
    pub rows: Vec<RawRecord>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
