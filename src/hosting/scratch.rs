use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::GenerationError;
use crate::hosting::{HostedAsset, ImageHost};
use crate::llm::media::extension_for_mime;
use crate::llm::GeneratedImage;
use crate::utils::retry::{call_with_retry, RetryPolicy};

static SLOT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9_-]+-[0-9a-f]{32}\.(png|jpg|webp|gif)$").expect("valid slot name regex")
});

fn remove_scratch(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Deleted scratch file {}", path.display()),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!("Failed to delete scratch file {}: {}", path.display(), err),
    }
}

#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        remove_scratch(&self.path);
    }
}

#[derive(Debug, Clone)]
pub struct TransientAssetStore {
    dir: PathBuf,
}

impl TransientAssetStore {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(TransientAssetStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn write(
        &self,
        label: &str,
        image: &GeneratedImage,
    ) -> Result<ScratchFile, GenerationError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|err| {
            GenerationError::Scratch(format!("create {}: {err}", self.dir.display()))
        })?;

        let file_name = format!(
            "{}-{}.{}",
            label,
            Uuid::new_v4().simple(),
            extension_for_mime(&image.mime_type)
        );
        let path = self.dir.join(file_name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|err| GenerationError::Scratch(format!("open {}: {err}", path.display())))?;
        // From here on the guard removes the file, including after a failed write.
        let scratch = ScratchFile { path };

        let io_error =
            |err: std::io::Error| GenerationError::Scratch(format!("write {}: {err}", scratch.path.display()));
        file.write_all(&image.bytes).await.map_err(io_error)?;
        file.flush().await.map_err(io_error)?;
        drop(file);

        Ok(scratch)
    }

    pub async fn persist_and_upload(
        &self,
        host: &dyn ImageHost,
        image: &GeneratedImage,
        label: &str,
        timeout: Duration,
        retry: &RetryPolicy,
    ) -> Result<HostedAsset, GenerationError> {
        let scratch = self.write(label, image).await?;
        // Timed-out uploads are not sent again.
        let retry = retry.without_timeout_retry();
        let result = call_with_retry("hosting.upload", timeout, &retry, || {
            host.upload(scratch.path())
        })
        .await;
        drop(scratch);
        result
    }

    pub fn sweep_stale(&self, min_age: Duration) -> usize {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Failed to read scratch directory {}: {}", self.dir.display(), err);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_slot = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| SLOT_NAME_RE.is_match(name));
            if !is_slot {
                continue;
            }
            let old_enough = entry
                .metadata()
                .ok()
                .filter(|meta| meta.is_file())
                .and_then(|meta| meta.modified().ok())
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age >= min_age);
            if old_enough {
                remove_scratch(&path);
                if !path.exists() {
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            info!("Removed {} stale scratch file(s) from {}", removed, self.dir.display());
        }
        removed
    }
}
