//! "Bare" version of the MPS users ingestion Lambda.
//!
//! This executable defines a server that you can easily interact with locally.
//! The handler flavor is chosen per invocation from the invoked function ARN;
//! under the local emulator, set `MPS_LOCALTEST_ARN` to a name ending in
//! `users-count` or `users-ingest`.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;

use mps_ingest::Services;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let svcs = Services::init().await?;
    let ref_svcs = &svcs;

    run(service_fn(|event: LambdaEvent<Value>| async move {
        let (payload, context) = event.into_parts();
        let mode = Services::mode_for_arn(&context.invoked_function_arn)?;
        ref_svcs.dispatch(mode, Some(payload)).await
    }))
    .await?;
    Ok(())
}
