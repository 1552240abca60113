//! On-disk store for uploaded samples
//!
//! Layout under the data directory:
//!
//! ```text
//! <data_dir>/<user_id>/user.json    last identity received for the user
//! <data_dir>/<user_id>/<n>.sample   raw sample bytes, n = 0, 1, 2, ...
//! ```

use anyhow::{Context, Result};
use parley_shared::{Identity, UserId};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const IDENTITY_FILE: &str = "user.json";
const SAMPLE_EXT: &str = "sample";

/// Sample store rooted at a data directory. Safe to share across sessions.
#[derive(Debug)]
pub struct SampleStore {
    root: PathBuf,
    // Serializes index allocation so concurrent uploads never share a file.
    write_lock: Mutex<()>,
}

impl SampleStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_dir(&self, user_id: UserId) -> PathBuf {
        self.root.join(user_id.to_string())
    }

    /// Record `identity` and append one sample for it. Returns the sample path.
    pub async fn save(&self, identity: &Identity, sample: &[u8]) -> Result<PathBuf> {
        let _guard = self.write_lock.lock().await;

        let dir = self.user_dir(identity.user_id());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        // The identity is only updated once its sample is on disk.
        let index = match sample_indices(&dir).await?.last() {
            Some(last) => last
                .checked_add(1)
                .with_context(|| format!("No sample index left in {}", dir.display()))?,
            None => 0,
        };
        let path = dir.join(format!("{index}.{SAMPLE_EXT}"));
        tokio::fs::write(&path, sample)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let json = serde_json::to_vec_pretty(identity).context("Failed to serialize identity")?;
        tokio::fs::write(dir.join(IDENTITY_FILE), json)
            .await
            .context("Failed to write identity")?;

        Ok(path)
    }

    /// Last identity stored for `user_id`, if any.
    pub async fn identity(&self, user_id: UserId) -> Result<Option<Identity>> {
        let path = self.user_dir(user_id).join(IDENTITY_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("Corrupt identity file {}", path.display()))?,
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Sample paths for `user_id` in upload order.
    pub async fn samples(&self, user_id: UserId) -> Result<Vec<PathBuf>> {
        let dir = self.user_dir(user_id);
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }
        Ok(sample_indices(&dir)
            .await?
            .into_iter()
            .map(|i| dir.join(format!("{i}.{SAMPLE_EXT}")))
            .collect())
    }
}

/// Sorted indices of the `<n>.sample` files in `dir`
async fn sample_indices(dir: &Path) -> Result<Vec<u64>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list {}", dir.display()))?;

    let mut indices = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(SAMPLE_EXT) {
            continue;
        }
        if let Some(index) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u64>().ok())
        {
            indices.push(index);
        }
    }
    indices.sort_unstable();
    Ok(indices)
}
