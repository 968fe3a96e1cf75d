//! Production bootstrap for the MPS users ingestion Lambda.
//!
//! Each Lambda process only ever serves one function, so unlike the "bare"
//! server we resolve the handler flavor once, from the function name that the
//! Lambda environment hands us, instead of on every invocation.

use lambda_runtime::{run, service_fn, tracing, Error, LambdaEvent};
use serde_json::Value;

use mps_ingest::Services;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let svcs = Services::init().await?;
    let ref_svcs = &svcs;

    let function_name = std::env::var("AWS_LAMBDA_FUNCTION_NAME")
        .map_err(|_| -> Error { "AWS_LAMBDA_FUNCTION_NAME not provided".into() })?;
    let mode = Services::mode_for_arn(&function_name)?;
    tracing::info!(function = %function_name, ?mode, "ready");

    run(service_fn(|event: LambdaEvent<Value>| async move {
        let (payload, context) = event.into_parts();
        let cfg = context.env_config;
        tracing::info!(version = %cfg.version, request_id = %context.request_id, "invoked");
        ref_svcs.dispatch(mode, Some(payload)).await
    }))
    .await?;

    Ok(())
}
