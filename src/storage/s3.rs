// src/storage/s3.rs

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::{config::Region, primitives::ByteStream, Client};
use tracing::{debug, info};

const PARQUET_CONTENT_TYPE: &str = "application/vnd.apache.parquet";

/// S3 (or S3-compatible) bucket using the default AWS credential chain.
pub struct S3Bucket {
    client: Client,
    bucket: String,
}

impl S3Bucket {
    pub async fn connect(bucket: &str, region: &str, endpoint: Option<&str>) -> Result<Self> {
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(endpoint) = endpoint {
            // custom endpoints (MinIO, localstack) want path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
        })
    }

    /// Single ListObjectsV2 call; anything past the first page is ignored.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .with_context(|| format!("listing s3://{}/{}*", self.bucket, prefix))?;

        let keys: Vec<String> = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();
        debug!(bucket = %self.bucket, prefix, count = keys.len(), "listed S3 objects");
        Ok(keys)
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("fetching s3://{}/{}", self.bucket, key))?;

        let data = output
            .body
            .collect()
            .await
            .with_context(|| format!("reading body of s3://{}/{}", self.bucket, key))?;
        Ok(data.into_bytes().to_vec())
    }

    pub async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(PARQUET_CONTENT_TYPE)
            .send()
            .await
            .with_context(|| format!("uploading {} to S3 bucket {}", key, self.bucket))?;

        info!(object = %key, bytes = len, "uploaded to s3://{}", self.bucket);
        Ok(())
    }
}
