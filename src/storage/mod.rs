// src/storage/mod.rs

use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use std::fmt;
use tracing::debug;
use url::Url;

pub mod gcs;
pub mod local;
pub mod s3;

/// Which object store a bucket lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    S3,
    Gcs,
    Local,
}

/// Client settings shared by every bucket of a run.
#[derive(Debug, Clone)]
pub struct StorageOptions {
    pub default_backend: Backend,
    pub region: String,
    pub endpoint: Option<String>,
}

/// A parsed bucket argument: backend, bucket name (a directory for the local
/// backend) and an optional key root inside the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketLocation {
    pub backend: Backend,
    pub bucket: String,
    pub root: String,
}

impl BucketLocation {
    /// Accepts `s3://bucket[/root]`, `gs://bucket[/root]`, `file://<dir>` or a
    /// bare name, which is resolved against `default_backend`.
    pub fn parse(raw: &str, default_backend: Backend) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            bail!("bucket name cannot be empty");
        }

        if let Some(dir) = raw.strip_prefix("file://") {
            return Self::local(dir);
        }

        if raw.contains("://") {
            let url = Url::parse(raw).with_context(|| format!("parsing bucket url {}", raw))?;
            let backend = match url.scheme() {
                "s3" => Backend::S3,
                "gs" => Backend::Gcs,
                other => bail!("unsupported storage scheme `{}` in {}", other, raw),
            };
            let bucket = url
                .host_str()
                .filter(|h| !h.is_empty())
                .ok_or_else(|| anyhow!("no bucket name in {}", raw))?
                .to_string();
            return Ok(Self {
                backend,
                bucket,
                root: url.path().trim_matches('/').to_string(),
            });
        }

        match default_backend {
            Backend::Local => Self::local(raw),
            backend => {
                let (bucket, root) = raw.split_once('/').unwrap_or((raw, ""));
                Ok(Self {
                    backend,
                    bucket: bucket.to_string(),
                    root: root.trim_matches('/').to_string(),
                })
            }
        }
    }

    fn local(dir: &str) -> Result<Self> {
        if dir.is_empty() {
            bail!("local bucket needs a directory");
        }
        Ok(Self {
            backend: Backend::Local,
            bucket: dir.to_string(),
            root: String::new(),
        })
    }

    /// Full object key for a key relative to this location.
    pub fn full_key(&self, key: &str) -> String {
        if self.root.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.root, key)
        }
    }

    /// Inverse of `full_key`; keys outside the root are left alone.
    pub fn relative_key<'a>(&self, full_key: &'a str) -> &'a str {
        if self.root.is_empty() {
            return full_key;
        }
        full_key
            .strip_prefix(self.root.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(full_key)
    }
}

impl fmt::Display for BucketLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.backend {
            Backend::S3 => "s3",
            Backend::Gcs => "gs",
            Backend::Local => "file",
        };
        write!(f, "{}://{}", scheme, self.bucket)?;
        if !self.root.is_empty() {
            write!(f, "/{}", self.root)?;
        }
        Ok(())
    }
}

/// A connected bucket. Keys passed in and handed back are relative to the
/// location's root.
pub struct Bucket {
    location: BucketLocation,
    inner: BucketKind,
}

enum BucketKind {
    S3(s3::S3Bucket),
    Gcs(gcs::GcsBucket),
    Local(local::LocalBucket),
}

impl Bucket {
    pub async fn connect(location: BucketLocation, options: &StorageOptions) -> Result<Self> {
        let inner = match location.backend {
            Backend::S3 => BucketKind::S3(
                s3::S3Bucket::connect(
                    &location.bucket,
                    &options.region,
                    options.endpoint.as_deref(),
                )
                .await?,
            ),
            Backend::Gcs => BucketKind::Gcs(gcs::GcsBucket::connect(&location.bucket).await?),
            Backend::Local => BucketKind::Local(local::LocalBucket::new(&location.bucket)),
        };
        debug!(location = %location, "connected bucket");
        Ok(Self { location, inner })
    }

    pub fn location(&self) -> &BucketLocation {
        &self.location
    }

    /// One listing call for `prefix`. Directory placeholders are dropped.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let full_prefix = self.location.full_key(prefix);
        let keys = match &self.inner {
            BucketKind::S3(b) => b.list(&full_prefix).await?,
            BucketKind::Gcs(b) => b.list(&full_prefix).await?,
            BucketKind::Local(b) => b.list(&full_prefix).await?,
        };
        Ok(visible_keys(&self.location, keys))
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let full_key = self.location.full_key(key);
        let result = match &self.inner {
            BucketKind::S3(b) => b.get(&full_key).await,
            BucketKind::Gcs(b) => b.get(&full_key).await,
            BucketKind::Local(b) => b.get(&full_key).await,
        };
        result.with_context(|| format!("reading {}/{}", self.location, key))
    }

    pub async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let full_key = self.location.full_key(key);
        let result = match &self.inner {
            BucketKind::S3(b) => b.put(&full_key, data).await,
            BucketKind::Gcs(b) => b.put(&full_key, data).await,
            BucketKind::Local(b) => b.put(&full_key, data).await,
        };
        result.with_context(|| format!("writing {}/{}", self.location, key))
    }
}

/// Drop directory placeholders (keys ending in `/`) and make the rest
/// relative to the location's root.
fn visible_keys(location: &BucketLocation, keys: Vec<String>) -> Vec<String> {
    keys.iter()
        .filter(|k| !k.ends_with('/'))
        .map(|k| location.relative_key(k).to_string())
        .collect()
}

/// Output key for an input key: extension swapped for `.parquet`.
pub fn parquet_key(key: &str) -> String {
    let stem = key.rsplit_once('.').map_or(key, |(stem, _)| stem);
    format!("{}.parquet", stem)
}
