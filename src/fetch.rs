//! Pulling the users payload from the public API.
//!
//! One GET, one attempt. The request timeout covers everything from
//! connecting to the end of the response body.

use lambda_runtime::tracing;
use serde_json::Value;
use std::{error::Error as StdError, time::Duration};

use crate::error::{ErrorKind, IngestionError};

pub async fn fetch_payload(
    http: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Value, IngestionError> {
    tracing::info!(url, timeout_secs = timeout.as_secs(), "fetching data from API");

    let resp = http
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(classify_transport)?;

    let status = resp.status();
    let resp = resp.error_for_status().map_err(classify_transport)?;
    let body = resp.bytes().await.map_err(classify_transport)?;
    tracing::info!(%status, bytes = body.len(), "data fetched");

    serde_json::from_slice(&body).map_err(|e| {
        IngestionError::invalid_response(format!("Invalid JSON response from API: {e}"))
    })
}

/// Pull the `results` array out of the payload.
///
/// An absent (or null) `results` key means the API had nothing for us, which
/// is a perfectly good zero-record run.
pub fn extract_results(payload: &Value) -> Result<&[Value], IngestionError> {
    let obj = payload.as_object().ok_or_else(|| {
        IngestionError::invalid_response("Invalid response from API: expected a JSON object")
    })?;

    match obj.get("results") {
        None | Some(Value::Null) => Ok(Default::default()),
        Some(Value::Array(records)) => Ok(records.as_slice()),
        Some(_) => Err(IngestionError::invalid_response(
            "Invalid response from API: `results` is not an array",
        )),
    }
}

fn classify_transport(e: reqwest::Error) -> IngestionError {
    if e.is_timeout() {
        return IngestionError::new(
            ErrorKind::Timeout,
            "Request timeout while fetching data from API",
        );
    }

    IngestionError::new(
        ErrorKind::FetchFailed,
        format!("Error fetching data from API: {}", error_chain(&e)),
    )
}

// reqwest's Display leaves out the underlying cause (DNS, connection refused,
// ...), which is the interesting part.
fn error_chain(e: &reqwest::Error) -> String {
    let mut text = e.to_string();
    let mut source = e.source();

    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn results_are_extracted() {
        let payload = json!({ "results": [{ "a": 1 }, { "a": 2 }], "info": { "seed": "x" } });
        assert_eq!(extract_results(&payload).unwrap().len(), 2);
    }

    #[test]
    fn missing_results_is_empty() {
        assert!(extract_results(&json!({ "info": {} })).unwrap().is_empty());
        assert!(extract_results(&json!({ "results": null })).unwrap().is_empty());
        assert!(extract_results(&json!({ "results": [] })).unwrap().is_empty());
    }

    #[test]
    fn wrong_shapes_are_invalid() {
        let e = extract_results(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(e.kind, ErrorKind::InvalidResponse);

        let e = extract_results(&json!({ "results": "nope" })).unwrap_err();
        assert_eq!(e.kind, ErrorKind::InvalidResponse);
    }
}
