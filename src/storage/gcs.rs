// src/storage/gcs.rs

use anyhow::{Context, Result};
use google_cloud_storage::{
    client::{Client, ClientConfig},
    http::objects::{
        download::Range,
        get::GetObjectRequest,
        list::ListObjectsRequest,
        upload::{Media, UploadObjectRequest, UploadType},
    },
};
use tracing::{debug, info};

/// Google Cloud Storage bucket, authenticated through ADC.
pub struct GcsBucket {
    client: Client,
    bucket: String,
}

impl GcsBucket {
    pub async fn connect(bucket: &str) -> Result<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .context("authenticating to GCS")?;
        Ok(Self {
            client: Client::new(config),
            bucket: bucket.to_string(),
        })
    }

    /// First page only.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let request = ListObjectsRequest {
            bucket: self.bucket.clone(),
            prefix: Some(prefix.to_string()),
            ..Default::default()
        };
        let response = self
            .client
            .list_objects(&request)
            .await
            .with_context(|| format!("listing gs://{}/{}*", self.bucket, prefix))?;

        let names: Vec<String> = response
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|object| object.name)
            .collect();
        debug!(bucket = %self.bucket, prefix, count = names.len(), "listed GCS objects");
        Ok(names)
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let request = GetObjectRequest {
            bucket: self.bucket.clone(),
            object: key.to_string(),
            ..Default::default()
        };
        self.client
            .download_object(&request, &Range::default())
            .await
            .with_context(|| format!("downloading gs://{}/{}", self.bucket, key))
    }

    pub async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let len = data.len();
        let mut media = Media::new(key.to_string());
        media.content_length = Some(len as u64);
        let request = UploadObjectRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };

        self.client
            .upload_object(&request, data, &UploadType::Simple(media))
            .await
            .with_context(|| format!("uploading {} to GCS bucket {}", key, self.bucket))?;

        info!(object = %key, bytes = len, "uploaded to gs://{}", self.bucket);
        Ok(())
    }
}
