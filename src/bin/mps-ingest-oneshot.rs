//! "Oneshot" version of the MPS users ingestion Lambda.
//!
//! This executable runs one invocation, based on arguments given on the
//! command line, using the same environment variables as the deployed
//! function, and prints the response.

use lambda_runtime::Error;
use serde_json::Value;
use std::env;

use mps_ingest::Services;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let mut args = env::args();
    args.next(); // skip argv[0]

    let arn = args.next().ok_or_else(|| -> Error {
        "first argument should be the function name to emulate (users-count, users-ingest)".into()
    })?;

    let payload: Option<Value> = match args.next() {
        Some(json_text) => Some(serde_json::from_str(&json_text)?),
        None => None,
    };

    let mode = Services::mode_for_arn(&arn)?;
    let svcs = Services::init().await?;
    let result = svcs.dispatch(mode, payload).await?;

    serde_json::to_writer(std::io::stdout().lock(), &result)?;
    Ok(())
}
