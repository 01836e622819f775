// src/pipeline.rs

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    config::Args,
    process::{convert::to_record_batch, load_csv, write::write_parquet_to_memory},
    storage::{parquet_key, Bucket},
    transform::{self, Rule, TransformOptions},
};

/// Everything one run needs: both buckets and the cleaning settings.
pub struct Job {
    /// The `input_bucket` argument as given, for messages.
    pub input_name: String,
    pub input: Bucket,
    pub output: Bucket,
    pub prefix: String,
    pub delimiter: u8,
    pub transform: TransformOptions,
}

impl Job {
    pub async fn from_args(args: &Args) -> Result<Self> {
        let storage = args.storage_options();
        let input = Bucket::connect(args.input_location()?, &storage)
            .await
            .context("connecting input bucket")?;
        let output = Bucket::connect(args.output_location()?, &storage)
            .await
            .context("connecting output bucket")?;
        Ok(Self {
            input_name: args.input_bucket.clone(),
            input,
            output,
            prefix: args.prefix.clone(),
            delimiter: args.delimiter_byte()?,
            transform: args.transform_options(),
        })
    }
}

/// Result of cleaning one object, before it is uploaded.
#[derive(Debug)]
pub struct CleanedObject {
    pub rule: Option<Rule>,
    pub rows: usize,
    pub columns: usize,
    pub parquet: Vec<u8>,
}

/// Totals for a whole run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files: usize,
    pub rows: u64,
    pub bytes: u64,
    pub objects: Vec<String>,
}

/// Read → transform → Parquet for one object's bytes. Pure; no bucket access.
pub fn clean_object(
    key: &str,
    data: &[u8],
    delimiter: u8,
    options: &TransformOptions,
) -> Result<CleanedObject> {
    let table = load_csv(data, delimiter).with_context(|| format!("parsing {}", key))?;
    let rule = Rule::for_key(key);
    let table =
        transform::apply(rule, table, options).with_context(|| format!("cleaning {}", key))?;
    let batch = to_record_batch(&table).with_context(|| format!("converting {}", key))?;
    let parquet = write_parquet_to_memory(&batch).with_context(|| format!("encoding {}", key))?;

    Ok(CleanedObject {
        rule,
        rows: table.num_rows(),
        columns: table.num_columns(),
        parquet,
    })
}

pub fn empty_bucket_message(input_name: &str) -> String {
    format!("Bucket {} is empty", input_name)
}

/// List the input prefix once, then clean and upload each object in order.
/// An empty listing ends the run without touching the output bucket.
pub async fn run(job: &Job) -> Result<RunSummary> {
    let keys = job
        .input
        .list(&job.prefix)
        .await
        .with_context(|| format!("listing {} with prefix {}", job.input.location(), job.prefix))?;

    if keys.is_empty() {
        warn!("{}", empty_bucket_message(&job.input_name));
        return Ok(RunSummary::default());
    }
    info!("{} objects to clean", keys.len());

    let mut summary = RunSummary::default();
    for key in &keys {
        let report = process_object(job, key).await?;
        summary.files += 1;
        summary.rows += report.rows as u64;
        summary.bytes += report.bytes as u64;
        summary.objects.push(report.out_key);
    }

    Ok(summary)
}

struct FileReport {
    out_key: String,
    rows: usize,
    bytes: usize,
}

#[instrument(level = "info", skip_all, fields(key = %key))]
async fn process_object(job: &Job, key: &str) -> Result<FileReport> {
    let data = job.input.get(key).await?;
    let cleaned = clean_object(key, &data, job.delimiter, &job.transform)?;
    drop(data);

    let out_key = parquet_key(key);
    let bytes = cleaned.parquet.len();
    info!(
        out_key = %out_key,
        rule = %cleaned.rule.map_or_else(|| "none".to_string(), |r| r.to_string()),
        rows = cleaned.rows,
        columns = cleaned.columns,
        bytes,
        "cleaned"
    );

    job.output.put(&out_key, cleaned.parquet).await?;

    Ok(FileReport {
        out_key,
        rows: cleaned.rows,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Backend, BucketLocation, StorageOptions};
    use crate::transform::reviews::CommentMode;
    use arrow::{array::StringArray, record_batch::RecordBatch};
    use clap::Parser;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::{fs, path::Path};
    use tempfile::TempDir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    const CUSTOMERS: &str = "customer_id,customer_unique_id,customer_zip_code_prefix,customer_city,customer_state
06b8999e2fba1a1fbc88172c00ba8bc7,861eff4711a542e4b93843c6dd7febb0,14409,franca,SP
18955e83d337fd6b2def6b18a428ac77,290c77bc529b7ac935b93aa66c333dc3,9790,sao bernardo do campo,SP
4e7b3e00288586ebd08712fdd0374a03,060e732b5b29e8181a18229c7b0b2b5e,1151,sao paulo,SP
";

    const SELLERS: &str = "seller_id,seller_zip_code_prefix,seller_city,seller_state
3442f8959a84dea7ee197c632cb2df15,13023,campinas,SP
d1b65fc7debc3361ea86b5f14c68d2e2,13844,mogi guacu,SP
";

    const REVIEWS: &str = "review_id,order_id,review_score,review_comment_title,review_comment_message,review_creation_date,review_answer_timestamp,,,,,,
7bc2406110b926393aa56f80a40eba40,73fc7af87114b39712e6da79b0a377eb,4,,,2018-01-18 00:00:00,2018-01-18 21:46:59,,,,,,
80e641a11e56f04c1ad469d5645fdfde,a548910a1c6147796b98fdf73dbeba33,5,,Recebi bem antes do prazo,2018-03-10 00:00:00,2018-03-11 03:05:13,,,,,,
228ce5500dc1d8e020d8d1322874b6f0,f9e4b658b201a9f2ecdecbb34bed034b,3,, Entregou, mas atrasou,2018-02-17 00:00:00,2018-02-18 13:02:51,,,,,
";

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,olist_etl=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    async fn local_bucket(dir: &Path) -> Result<Bucket> {
        let options = StorageOptions {
            default_backend: Backend::Local,
            region: "us-east-1".into(),
            endpoint: None,
        };
        let location = BucketLocation::parse(&dir.display().to_string(), Backend::Local)?;
        Bucket::connect(location, &options).await
    }

    async fn job_with(files: &[(&str, &str)]) -> Result<(TempDir, TempDir, Job)> {
        let input_dir = tempfile::tempdir()?;
        let output_dir = tempfile::tempdir()?;
        for (key, body) in files {
            let path = input_dir.path().join(key);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, body)?;
        }
        let job = Job {
            input_name: "raw".into(),
            input: local_bucket(input_dir.path()).await?,
            output: local_bucket(output_dir.path()).await?,
            prefix: "olist".into(),
            delimiter: b',',
            transform: TransformOptions::default(),
        };
        Ok((input_dir, output_dir, job))
    }

    fn read_parquet(path: &Path) -> Result<RecordBatch> {
        let file = fs::File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let batches: Vec<RecordBatch> = reader.collect::<Result<_, _>>()?;
        Ok(arrow::compute::concat_batches(&batches[0].schema(), &batches)?)
    }

    fn column_names(batch: &RecordBatch) -> Vec<String> {
        batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    fn strings(batch: &RecordBatch, idx: usize) -> Vec<Option<String>> {
        let arr = batch
            .column(idx)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("utf8 column");
        arr.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[tokio::test]
    async fn test_empty_listing_is_a_clean_exit() -> Result<()> {
        init_test_logging();
        let (_in, out, job) = job_with(&[("readme.csv", "a\n1\n")]).await?;

        let summary = run(&job).await?;
        assert_eq!(summary, RunSummary::default());
        assert_eq!(fs::read_dir(out.path())?.count(), 0);
        assert_eq!(empty_bucket_message(&job.input_name), "Bucket raw is empty");
        Ok(())
    }

    #[test]
    fn test_empty_message_uses_argument_as_given() -> Result<()> {
        let args = Args::try_parse_from([
            "olist-etl",
            "--input_bucket",
            "raw",
            "--output_bucket",
            "clean",
            "--backend",
            "s3",
        ])?;
        assert_eq!(args.input_location()?.to_string(), "s3://raw");
        assert_eq!(empty_bucket_message(&args.input_bucket), "Bucket raw is empty");
        Ok(())
    }

    #[tokio::test]
    async fn test_full_run_cleans_each_dataset() -> Result<()> {
        init_test_logging();
        let (_in, out, job) = job_with(&[
            ("olist_customers_dataset.csv", CUSTOMERS),
            ("olist_sellers_dataset.csv", SELLERS),
            ("olist_order_reviews_dataset.csv", REVIEWS),
            ("other/olist_ignored.csv", CUSTOMERS),
        ])
        .await?;

        let summary = run(&job).await?;
        assert_eq!(summary.files, 3);
        assert_eq!(summary.rows, 3 + 2 + 3);
        assert_eq!(
            summary.objects,
            vec![
                "olist_customers_dataset.parquet",
                "olist_order_reviews_dataset.parquet",
                "olist_sellers_dataset.parquet",
            ]
        );
        assert!(!out.path().join("other").exists());

        // untouched apart from the format
        let customers = read_parquet(&out.path().join("olist_customers_dataset.parquet"))?;
        assert_eq!(customers.num_rows(), 3);
        assert_eq!(
            column_names(&customers),
            vec![
                "customer_id",
                "customer_unique_id",
                "customer_zip_code_prefix",
                "customer_city",
                "customer_state"
            ]
        );

        let sellers = read_parquet(&out.path().join("olist_sellers_dataset.parquet"))?;
        assert_eq!(sellers.num_rows(), 2);
        assert_eq!(
            column_names(&sellers),
            vec!["seller_id", "seller_zip_code_prefix"]
        );

        let reviews = read_parquet(&out.path().join("olist_order_reviews_dataset.parquet"))?;
        assert_eq!(reviews.num_rows(), 3);
        assert_eq!(
            column_names(&reviews),
            vec![
                "review_id",
                "order_id",
                "review_score",
                "review_comment_title",
                "review_comment_message",
                "review_creation_date",
                "review_answer_timestamp"
            ]
        );
        assert_eq!(
            strings(&reviews, 4),
            vec![
                None,
                Some("Recebi bem antes do prazo".to_string()),
                Some(",2018-02-17 00:00:00".to_string()),
            ]
        );
        assert_eq!(
            strings(&reviews, 5)[2].as_deref(),
            Some("2018-02-17 00:00:00")
        );
        assert_eq!(
            strings(&reviews, 6)[2].as_deref(),
            Some("2018-02-18 13:02:51")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_output_does_not_depend_on_other_files() -> Result<()> {
        init_test_logging();
        let (_in, alone_out, alone) = job_with(&[("olist_sellers_dataset.csv", SELLERS)]).await?;
        run(&alone).await?;

        let (_in2, both_out, both) = job_with(&[
            ("olist_aaa_first.csv", CUSTOMERS),
            ("olist_sellers_dataset.csv", SELLERS),
        ])
        .await?;
        run(&both).await?;

        let a = read_parquet(&alone_out.path().join("olist_sellers_dataset.parquet"))?;
        let b = read_parquet(&both_out.path().join("olist_sellers_dataset.parquet"))?;
        assert_eq!(a, b);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_seller_column_aborts_the_run() -> Result<()> {
        init_test_logging();
        let broken = "seller_id,seller_city\ns1,campinas\n";
        let (_in, out, job) = job_with(&[("olist_sellers_dataset.csv", broken)]).await?;

        let err = run(&job).await.unwrap_err();
        assert!(format!("{:#}", err).contains("seller_state"), "{err:#}");
        assert_eq!(fs::read_dir(out.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_clean_object_reports_rule_and_shape() -> Result<()> {
        let options = TransformOptions {
            comment_mode: CommentMode::Accumulate,
        };
        let cleaned = clean_object(
            "olist_order_reviews_dataset.csv",
            REVIEWS.as_bytes(),
            b',',
            &options,
        )?;
        assert_eq!(cleaned.rule, Some(Rule::OrderReviews));
        assert_eq!(cleaned.rows, 3);
        assert_eq!(cleaned.columns, 7);
        assert!(!cleaned.parquet.is_empty());
        Ok(())
    }
}
