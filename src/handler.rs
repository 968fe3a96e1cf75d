//! The ingestion pipeline itself.
//!
//! validate config → fetch → extract `results` → (persist) normalize →
//! Parquet → upload. Every step either hands its output to the next or aborts
//! the whole invocation. The upload is the only side effect and comes last,
//! so a failure anywhere leaves the bucket untouched.

use chrono::{DateTime, Utc};
use lambda_runtime::tracing;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    columnar,
    config::{FetchConfig, Mode, ValidatedConfig},
    error::IngestionError,
    fetch, normalize, partition,
    storage::ObjectSink,
};

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct IngestionResult {
    pub records_fetched: usize,

    /// `s3://bucket/key` of the uploaded file. `None` when nothing was written.
    pub destination_path: Option<String>,
}

impl IngestionResult {
    /// The `body` of a successful invocation.
    pub fn response_body(&self, mode: Mode) -> Value {
        match mode {
            Mode::CountOnly => json!({
                "message": "Data extracted successfully.",
                "users_count": self.records_fetched,
            }),

            Mode::Persist => json!({
                "message": "Data ingested successfully.",
                "s3_path": self.destination_path,
                "users_count": self.records_fetched,
            }),
        }
    }

    pub fn to_response(&self, mode: Mode) -> Value {
        json!({
            "statusCode": 200,
            "body": self.response_body(mode),
        })
    }
}

pub struct IngestionHandler<S> {
    http: reqwest::Client,
    sink: S,
}

impl<S: ObjectSink> IngestionHandler<S> {
    pub fn new(http: reqwest::Client, sink: S) -> Self {
        IngestionHandler { http, sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn ingest(
        &self,
        config: &FetchConfig,
        mode: Mode,
    ) -> Result<IngestionResult, IngestionError> {
        self.ingest_at(config, mode, Utc::now()).await
    }

    /// Run one ingestion as if invoked at `now`, which picks the day
    /// partition.
    pub async fn ingest_at(
        &self,
        config: &FetchConfig,
        mode: Mode,
        now: DateTime<Utc>,
    ) -> Result<IngestionResult, IngestionError> {
        tracing::info!(?mode, "starting data fetch from API");

        let result = self.run(config, mode, now).await;

        match &result {
            Ok(r) => tracing::info!(
                records = r.records_fetched,
                destination = r.destination_path.as_deref().unwrap_or("-"),
                "ingestion finished"
            ),
            Err(e) => tracing::error!(kind = %e.kind, "{}", e.message),
        }

        result
    }

    async fn run(
        &self,
        config: &FetchConfig,
        mode: Mode,
        now: DateTime<Utc>,
    ) -> Result<IngestionResult, IngestionError> {
        let config = config.validate(mode)?;
        let payload = fetch::fetch_payload(&self.http, &config.source_url, config.timeout).await?;
        let records = fetch::extract_results(&payload)?;
        tracing::info!("number of records fetched: {}", records.len());

        let destination_path = match (mode, &config.destination_container) {
            (Mode::Persist, Some(bucket)) => self.persist(&config, bucket, records, now).await?,
            _ => None,
        };

        Ok(IngestionResult {
            records_fetched: records.len(),
            destination_path,
        })
    }

    async fn persist(
        &self,
        config: &ValidatedConfig,
        bucket: &str,
        records: &[Value],
        now: DateTime<Utc>,
    ) -> Result<Option<String>, IngestionError> {
        if records.is_empty() {
            tracing::info!("no records; nothing to upload");
            return Ok(None);
        }

        let table = normalize::normalize(records, &config.numeric_columns)?;

        let metadata = vec![
            ("mps.records".to_owned(), table.num_rows().to_string()),
            ("mps.source_url".to_owned(), config.source_url.clone()),
        ];

        let buf = columnar::write_parquet_bytes(&table, metadata)
            .map_err(|e| IngestionError::internal(format!("Unexpected error: {e}")))?;

        let key = partition::object_key(now, Uuid::new_v4());
        tracing::info!(
            bucket,
            key = %key,
            columns = table.columns.len(),
            bytes = buf.len(),
            "uploading parquet"
        );

        self.sink.put_object(bucket, &key, buf).await?;
        Ok(Some(format!("s3://{bucket}/{key}")))
    }
}
