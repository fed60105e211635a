use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info};

use crate::db::{self, ProfileRow};
use crate::parser::SENTINEL;
use crate::record::{ProfileRecord, EMAIL_PLACEHOLDER};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("collector request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("collector answered {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("collector response is not JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("record could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("local store write failed: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Where finished records go. Delivery reports its outcome; retrying or
/// queueing is up to the caller (and the watcher does neither).
#[async_trait]
pub trait Sink: Send + Sync {
    async fn deliver(&self, record: &ProfileRecord) -> Result<Value, SinkError>;
}

/// Hand a record to the sink and log the outcome. Failures end here.
pub async fn dispatch(sink: &dyn Sink, record: &ProfileRecord) {
    info!(
        kind = record.kind().label(),
        url = record.source_url(),
        record = %serde_json::to_string(record).unwrap_or_default(),
        "profile detected"
    );
    match sink.deliver(record).await {
        Ok(response) => info!(%response, "collector response"),
        Err(e) => error!(url = record.source_url(), "delivery failed: {}", e),
    }
}

// ── HTTP collector ──

pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpSink {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn deliver(&self, record: &ProfileRecord) -> Result<Value, SinkError> {
        let response = self.client.post(&self.endpoint).json(record).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(SinkError::Decode)
    }
}

// ── Local store ──

/// Keeps the latest capture of every page in SQLite, keyed by URL.
pub struct StoreSink {
    conn: Mutex<Connection>,
}

impl StoreSink {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = db::connect(path)?;
        db::init_schema(&conn)?;
        Ok(StoreSink {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl Sink for StoreSink {
    async fn deliver(&self, record: &ProfileRecord) -> Result<Value, SinkError> {
        let full_data = stored_payload(record).map_err(SinkError::Encode)?;
        let row = ProfileRow::from_record(record);
        let conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        db::upsert_profile(&conn, &row, &full_data)?;
        Ok(json!({ "status": "success", "type": row.kind, "url": row.url }))
    }
}

/// The record as the collector files it: placeholder email and missing about
/// text are dropped rather than stored.
fn stored_payload(record: &ProfileRecord) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(record)?;
    if let Some(fields) = value.as_object_mut() {
        if fields.get("email").and_then(Value::as_str) == Some(EMAIL_PLACEHOLDER) {
            fields.remove("email");
        }
        if fields.get("aboutSummary").and_then(Value::as_str) == Some(SENTINEL) {
            fields.remove("aboutSummary");
        }
    }
    serde_json::to_string(&value)
}
