use std::path::{Path, PathBuf};

use async_trait::async_trait;
use spiralgen::{Fetcher, PluginError};

/// Serves `file://` URLs and plain paths from disk. Relative paths resolve
/// against `base`. There is no network transport.
pub struct FileFetcher {
    base: PathBuf,
}

impl FileFetcher {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        FileFetcher { base: base.into() }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, PluginError> {
        let path = match url.strip_prefix("file://") {
            Some(path) => path,
            None if url.contains("://") => {
                return Err(PluginError::Fetch {
                    url: url.to_string(),
                    reason: "only file:// URLs and local paths can be fetched".into(),
                });
            }
            None => url,
        };
        let path = Path::new(path);
        Ok(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        })
    }
}

#[async_trait]
impl Fetcher for FileFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PluginError> {
        let path = self.resolve(url)?;
        tracing::debug!(url, path = %path.display(), "reading from disk");
        tokio::fs::read(&path).await.map_err(|e| PluginError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}
