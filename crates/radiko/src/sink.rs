use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use crate::error::SinkError;
use crate::segment::AacArtifact;

/// Destination for finished artifacts.
#[async_trait]
pub trait FileSink: Send + Sync {
    /// Saves the artifact and returns where it landed.
    async fn save(&self, artifact: &AacArtifact) -> Result<PathBuf, SinkError>;
}

/// Writes artifacts as `<dir>/<filename>`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FileSink for DirectorySink {
    async fn save(&self, artifact: &AacArtifact) -> Result<PathBuf, SinkError> {
        let io_err = |source| SinkError::Io {
            filename: artifact.filename.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        let path = self.dir.join(&artifact.filename);
        tokio::fs::write(&path, &artifact.data).await.map_err(io_err)?;
        info!(path = %path.display(), bytes = artifact.data.len(), mime = artifact.mime, "Saved artifact");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_directory_sink_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        let artifact = AacArtifact {
            filename: "RADIKO_TBS_20240101_120000.aac".into(),
            mime: crate::segment::AAC_MIME,
            data: Bytes::from_static(&[0xFF, 0xF1, 0x00]),
        };

        let path = sink.save(&artifact).await.unwrap();
        assert_eq!(path, dir.path().join("out").join("RADIKO_TBS_20240101_120000.aac"));
        assert_eq!(std::fs::read(path).unwrap(), vec![0xFF, 0xF1, 0x00]);
    }
}
