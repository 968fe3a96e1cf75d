//! Where the Parquet output goes.
//!
//! In the cloud that's S3, through a client built once per Lambda process and
//! handed to the handler. Tests use [`MemorySink`] instead.

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use std::sync::Mutex;

pub const PARQUET_CONTENT_TYPE: &str = "application/vnd.apache.parquet";

#[async_trait]
pub trait ObjectSink: Send + Sync {
    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct S3Sink {
    client: aws_sdk_s3::Client,
}

impl S3Sink {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        S3Sink { client }
    }
}

#[async_trait]
impl ObjectSink for S3Sink {
    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(container)
            .key(key)
            .content_type(PARQUET_CONTENT_TYPE)
            .body(ByteStream::from(body))
            .send()
            .await?;
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredObject {
    pub container: String,
    pub key: String,
    pub body: Vec<u8>,
}

/// An in-process stand-in for the data bucket.
#[derive(Debug, Default)]
pub struct MemorySink {
    objects: Mutex<Vec<StoredObject>>,
}

impl MemorySink {
    /// Everything written so far, in write order.
    pub fn objects(&self) -> Vec<StoredObject> {
        match self.objects.lock() {
            Ok(objects) => objects.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ObjectSink for MemorySink {
    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink lock poisoned"))?;

        // Same key overwrites, as S3 does.
        objects.retain(|o| !(o.container == container && o.key == key));
        objects.push(StoredObject {
            container: container.to_owned(),
            key: key.to_owned(),
            body,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_sink_overwrites_same_key() {
        let sink = MemorySink::default();
        sink.put_object("b", "k1", vec![1]).await.unwrap();
        sink.put_object("b", "k2", vec![2]).await.unwrap();
        sink.put_object("b", "k1", vec![3]).await.unwrap();

        let objects = sink.objects();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].key, "k2");
        assert_eq!(objects[1].key, "k1");
        assert_eq!(objects[1].body, vec![3]);
    }
}
