//! "Proxy event" version of the MPS users ingestion Lambda.
//!
//! This executable defines a server that expects to be interacted with
//! according to AWS API Gateway's "proxy event" protocol. Here a failed
//! ingestion is not a failed invocation: it becomes an HTTP response carrying
//! an `{"error": ...}` body and a status code chosen by the error kind.

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde_json::Value;

use mps_ingest::Services;

fn json_response(status: u16, body: &Value) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let svcs = Services::init().await?;
    let ref_svcs = &svcs;

    run(service_fn(|req: Request| async move {
        let context = req.lambda_context();
        let mode = Services::mode_for_arn(&context.invoked_function_arn)?;

        match ref_svcs.run(mode).await {
            Ok(result) => json_response(200, &result.response_body(mode)),
            Err(e) => json_response(e.status_code(), &e.to_body()),
        }
    }))
    .await?;
    Ok(())
}
