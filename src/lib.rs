//! The MPS users ingestion Lambda
//!
//! Pulls a batch of users from a public JSON API and lands it in the data lake
//! as a Parquet file under a day partition, where a scheduled Glue crawler
//! picks it up. The provisioning side (buckets, crawler, IAM) lives in the
//! infrastructure stack; this crate is only the code that runs on each
//! trigger.
//!
//! The library is compiled into a few executables, following the usual
//! layout for a Rust Lambda package:
//!
//! - `mps-ingest`, the production bootstrap;
//! - `mps-ingest-bare`, a JSON-in/JSON-out server handy for local testing;
//! - `mps-ingest-proxyevent`, for use behind API Gateway, which reports
//!   failures as HTTP status codes;
//! - `mps-ingest-oneshot`, which runs one invocation from the command line.
//!
//! There are two flavors of the handler. `users-count` just fetches and counts
//! the records; `users-ingest` also writes them out. We figure out which one
//! we are from the suffix of the function name, so one deployment package
//! serves both functions.

use lambda_runtime::Error;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

pub mod columnar;
pub mod config;
pub mod error;
pub mod fetch;
pub mod handler;
pub mod normalize;
pub mod partition;
pub mod storage;

pub use config::{FetchConfig, Mode};
pub use error::{ErrorKind, IngestionError};
pub use handler::{IngestionHandler, IngestionResult};

pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
pub const LOCALTEST_ARN_VAR: &str = "MPS_LOCALTEST_ARN";

pub struct Services {
    handler: IngestionHandler<storage::S3Sink>,
}

impl Services {
    /// Create the process-wide state: logging, the AWS config, and the HTTP
    /// and S3 clients, which are reused across invocations.
    pub async fn init() -> Result<Self, Error> {
        let filter =
            EnvFilter::try_from_env(LOG_LEVEL_VAR).unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false) // don't print the module name
            .without_time() // don't print time (CloudWatch has it)
            .init();

        let config = aws_config::load_from_env().await;
        let s3c = aws_sdk_s3::Client::new(&config);

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Services {
            handler: IngestionHandler::new(http, storage::S3Sink::new(s3c)),
        })
    }

    /// Figure out which handler flavor an invoked function ARN (or function
    /// name) refers to.
    ///
    /// When running locally under the Lambda emulator, the ARN always ends
    /// with `:test_function`, so `MPS_LOCALTEST_ARN` stands in for it.
    pub fn mode_for_arn(arn: &str) -> Result<Mode, Error> {
        let arn = if arn.ends_with(":test_function") {
            std::env::var(LOCALTEST_ARN_VAR).map_err(|_| -> Error {
                format!("local testing requires the {LOCALTEST_ARN_VAR} environment variable")
                    .into()
            })?
        } else {
            arn.to_owned()
        };

        if arn.ends_with("users-count") {
            Ok(Mode::CountOnly)
        } else if arn.ends_with("users-ingest") {
            Ok(Mode::Persist)
        } else {
            Err(format!("unhandled function: {}", arn).into())
        }
    }

    /// Run one ingestion with the configuration currently in the environment.
    pub async fn run(&self, mode: Mode) -> Result<IngestionResult, IngestionError> {
        self.handler.ingest(&FetchConfig::from_env(), mode).await
    }

    /// Handle one JSON invocation. The trigger payload carries nothing we
    /// use. Failures are returned to the runtime, which reports the
    /// invocation as failed.
    pub async fn dispatch(&self, mode: Mode, _payload: Option<Value>) -> Result<Value, Error> {
        let result = self.run(mode).await?;
        Ok(result.to_response(mode))
    }
}
