use serde::Serialize;
use std::fmt;

/// Fully-qualified identifier of the destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        TableRef {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Table schema in the store's JSON schema format.
#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub mode: FieldMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    Numeric,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    Nullable,
    Required,
}

impl TableSchema {
    /// The fixed schema the loader targets: numeric `id`, string `name`,
    /// both nullable. Defined once at startup and never evolved.
    pub fn user_records() -> Self {
        TableSchema {
            fields: vec![
                FieldSchema {
                    name: "id".to_string(),
                    field_type: FieldType::Numeric,
                    mode: FieldMode::Nullable,
                },
                FieldSchema {
                    name: "name".to_string(),
                    field_type: FieldType::String,
                    mode: FieldMode::Nullable,
                },
            ],
        }
    }
}
