//! REST client for the BigQuery v2 table and streaming-insert surface.
//!
//! Authentication is a bearer token supplied by the caller; token refresh is
//! the operator's concern. The endpoint is overridable so emulators and tests
//! can stand in for the real service.

use crate::{
    error::StoreError,
    store::{CreateOutcome, StoreSession, TableStore},
};
use async_trait::async_trait;
use model::{
    records::UserRecord,
    table::{TableRef, TableSchema},
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Public BigQuery v2 endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Deadline applied to every remote call.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct BigQueryStore {
    http: Client,
    endpoint: String,
    token: Option<String>,
}

impl BigQueryStore {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(BigQueryStore {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn tables_url(&self, table: &TableRef) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables",
            self.endpoint, table.project, table.dataset
        )
    }

    fn insert_all_url(&self, table: &TableRef) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables/{}/insertAll",
            self.endpoint, table.project, table.dataset, table.table
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TableDefinition<'a> {
    table_reference: TableReference<'a>,
    schema: &'a TableSchema,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TableReference<'a> {
    project_id: &'a str,
    dataset_id: &'a str,
    table_id: &'a str,
}

#[derive(Serialize)]
struct InsertAllRequest<'a> {
    rows: Vec<InsertRow<'a>>,
}

#[derive(Serialize)]
struct InsertRow<'a> {
    json: &'a UserRecord,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertError {
    index: usize,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Deserialize)]
struct ErrorProto {
    #[serde(default)]
    message: String,
}

async fn api_error(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let message = match response.text().await {
        Ok(body) => extract_error_message(&body),
        Err(err) => err.to_string(),
    };
    StoreError::Api { status, message }
}

fn extract_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.trim().chars().take(200).collect(),
    }
}

#[async_trait]
impl TableStore for BigQueryStore {
    async fn create_table(
        &self,
        table: &TableRef,
        schema: &TableSchema,
    ) -> Result<CreateOutcome, StoreError> {
        let body = TableDefinition {
            table_reference: TableReference {
                project_id: &table.project,
                dataset_id: &table.dataset,
                table_id: &table.table,
            },
            schema,
        };
        let response = self
            .authorize(self.http.post(self.tables_url(table)))
            .json(&body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(CreateOutcome::Created),
            StatusCode::CONFLICT => Ok(CreateOutcome::AlreadyExists),
            _ => Err(api_error(response).await),
        }
    }

    async fn open_session(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        Ok(Box::new(BigQuerySession {
            store: self.clone(),
        }))
    }
}

/// One worker's handle on the streaming-insert surface.
struct BigQuerySession {
    store: BigQueryStore,
}

#[async_trait]
impl StoreSession for BigQuerySession {
    async fn insert_rows(&self, table: &TableRef, rows: &[UserRecord]) -> Result<(), StoreError> {
        let request = InsertAllRequest {
            rows: rows.iter().map(|row| InsertRow { json: row }).collect(),
        };
        let response = self
            .store
            .authorize(self.store.http.post(self.store.insert_all_url(table)))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        // insertAll reports per-row failures in a 200 body.
        let body: InsertAllResponse = response.json().await?;
        if !body.insert_errors.is_empty() {
            let detail = body
                .insert_errors
                .iter()
                .find_map(|row_error| {
                    row_error
                        .errors
                        .first()
                        .map(|proto| format!("row {}: {}", row_error.index, proto.message))
                })
                .unwrap_or_else(|| "no reason given".to_string());
            return Err(StoreError::RowsRejected {
                rejected: body.insert_errors.len(),
                total: rows.len(),
                detail,
            });
        }

        debug!(table = %table, rows = rows.len(), "insertAll accepted");
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        // The HTTP client pools connections; dropping the handle is enough.
        Ok(())
    }
}
