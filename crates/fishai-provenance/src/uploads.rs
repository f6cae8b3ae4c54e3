//! Upload sink: writes accepted image bytes under the upload directory and
//! hands back the public URL they are served from.

use fishai_core::{ClassificationRecord, Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Durable home for uploaded images
#[derive(Debug, Clone)]
pub struct UploadSink {
    dir: PathBuf,
    public_prefix: String,
}

impl UploadSink {
    /// `public_prefix` is the URL path the directory is served under,
    /// e.g. `/api/uploads`.
    pub fn new(dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        let public_prefix = public_prefix.into().trim_end_matches('/').to_string();
        Self {
            dir: dir.into(),
            public_prefix,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Path the record's upload is written to. Names that would resolve
    /// outside the upload directory are refused.
    pub fn path_for(&self, record: &ClassificationRecord) -> Result<PathBuf> {
        let name = record.upload_name();
        let mut components = Path::new(&name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => {
                Ok(self.dir.join(name))
            }
            _ => Err(Error::storage(format!("unsafe upload name {name:?}"))),
        }
    }

    /// Persist `bytes` for `record` and return the public URL.
    ///
    /// Writing the same record twice overwrites the earlier file.
    pub fn store(&self, record: &ClassificationRecord, bytes: &[u8]) -> Result<String> {
        let path = self.path_for(record)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            Error::storage(format!("failed to create {}: {}", self.dir.display(), e))
        })?;
        std::fs::write(&path, bytes)
            .map_err(|e| Error::storage(format!("failed to write {}: {}", path.display(), e)))?;

        debug!(id = %record.id, path = %path.display(), size = bytes.len(), "Stored upload");
        Ok(format!("{}/{}", self.public_prefix, record.upload_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fishai_core::Prediction;
    use tempfile::TempDir;

    fn record(name: &str) -> ClassificationRecord {
        ClassificationRecord::new(name, vec![Prediction::new("carp", 0.9).unwrap()]).unwrap()
    }

    #[test]
    fn test_store_returns_public_url() {
        let temp_dir = TempDir::new().unwrap();
        let sink = UploadSink::new(temp_dir.path().join("uploads"), "/api/uploads/");
        let r = record("carp.jpg");

        let url = sink.store(&r, b"bytes").unwrap();
        assert_eq!(url, format!("/api/uploads/{}-carp.jpg", r.id));

        let written = std::fs::read(sink.dir().join(r.upload_name())).unwrap();
        assert_eq!(written, b"bytes");
    }

    #[test]
    fn test_traversal_names_stay_inside_dir() {
        let temp_dir = TempDir::new().unwrap();
        let uploads = temp_dir.path().join("uploads");
        let sink = UploadSink::new(&uploads, "/api/uploads");
        let r = record("../../etc/passwd");

        sink.store(&r, b"x").unwrap();
        let path = sink.path_for(&r).unwrap();
        assert_eq!(path.parent().unwrap(), uploads);
        assert!(path.file_name().unwrap().to_string_lossy().ends_with("._._etc_passwd"));
    }

    #[test]
    fn test_rejects_unsafe_names() {
        let temp_dir = TempDir::new().unwrap();
        let sink = UploadSink::new(temp_dir.path(), "/api/uploads");
        let mut r = record("a.jpg");
        r.id = "../escape".to_string();

        assert!(matches!(sink.store(&r, b"x"), Err(Error::Storage(_))));
    }

    #[test]
    fn test_retry_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let sink = UploadSink::new(temp_dir.path(), "/api/uploads");
        let r = record("a.jpg");

        let first = sink.store(&r, b"first").unwrap();
        let second = sink.store(&r, b"second").unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(sink.path_for(&r).unwrap()).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}
