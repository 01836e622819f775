// src/config.rs

use anyhow::{bail, Result};
use clap::Parser;

use crate::{
    storage::{Backend, BucketLocation, StorageOptions},
    transform::{reviews::CommentMode, TransformOptions},
};

/// Key prefix every olist export shares.
pub const DEFAULT_PREFIX: &str = "olist";

/// Command-line args: input bucket, output bucket, plus storage/cleaning knobs.
/// Every flag can also be supplied through its environment variable.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "olist-etl",
    about = "Clean the olist CSV exports in a bucket and rewrite them as Parquet"
)]
pub struct Args {
    /// Bucket holding the raw CSV exports (`s3://name`, `gs://name`, `file:///dir` or a bare name)
    #[arg(long = "input_bucket", alias = "input-bucket", env = "OLIST_ETL_INPUT_BUCKET")]
    pub input_bucket: String,

    /// Bucket receiving the Parquet files
    #[arg(long = "output_bucket", alias = "output-bucket", env = "OLIST_ETL_OUTPUT_BUCKET")]
    pub output_bucket: String,

    /// Only keys starting with this prefix are processed
    #[arg(long, env = "OLIST_ETL_PREFIX", default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Backend used for bucket names given without a scheme
    #[arg(long, env = "OLIST_ETL_BACKEND", value_enum, default_value_t = Backend::S3)]
    pub backend: Backend,

    /// AWS region for the S3 backend
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Custom S3 endpoint (MinIO, localstack, ...)
    #[arg(long, env = "OLIST_ETL_S3_ENDPOINT")]
    pub endpoint: Option<String>,

    /// How split review comments are rebuilt
    #[arg(
        long = "comment-mode",
        env = "OLIST_ETL_COMMENT_MODE",
        value_enum,
        default_value_t = CommentMode::Literal
    )]
    pub comment_mode: CommentMode,

    /// Field delimiter of the input files
    #[arg(long, env = "OLIST_ETL_DELIMITER", default_value_t = ',')]
    pub delimiter: char,
}

impl Args {
    pub fn storage_options(&self) -> StorageOptions {
        StorageOptions {
            default_backend: self.backend,
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
        }
    }

    pub fn input_location(&self) -> Result<BucketLocation> {
        BucketLocation::parse(&self.input_bucket, self.backend)
    }

    pub fn output_location(&self) -> Result<BucketLocation> {
        BucketLocation::parse(&self.output_bucket, self.backend)
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            comment_mode: self.comment_mode,
        }
    }

    /// The CSV reader wants a single byte.
    pub fn delimiter_byte(&self) -> Result<u8> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter {:?} is not a single ASCII character", self.delimiter);
        }
        Ok(self.delimiter as u8)
    }
}
