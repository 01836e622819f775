// src/storage/local.rs

use anyhow::{bail, Context, Result};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// A directory standing in for a bucket. Object keys are `/`-separated paths
/// relative to the directory.
pub struct LocalBucket {
    root: PathBuf,
}

impl LocalBucket {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walk the whole tree and keep keys starting with `prefix`, sorted.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(dir) = stack.pop() {
            let mut rd = fs::read_dir(&dir)
                .await
                .with_context(|| format!("reading directory {}", dir.display()))?;
            while let Some(entry) = rd.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    stack.push(path);
                    continue;
                }
                let key = self.key_for(&path)?;
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        debug!(root = %self.root.display(), prefix, count = keys.len(), "listed local objects");
        Ok(keys)
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }

    pub async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let len = data.len();
        fs::write(&path, data)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!(object = %key, bytes = len, "wrote {}", path.display());
        Ok(())
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for part in key.split('/').filter(|p| !p.is_empty()) {
            if part == "." || part == ".." {
                bail!("object key `{}` escapes the bucket directory", key);
            }
            path.push(part);
        }
        Ok(path)
    }

    fn key_for(&self, path: &Path) -> Result<String> {
        let rel = path.strip_prefix(&self.root).with_context(|| {
            format!(
                "path {} is not under root {}",
                path.display(),
                self.root.display()
            )
        })?;
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Ok(parts.join("/"))
    }
}
