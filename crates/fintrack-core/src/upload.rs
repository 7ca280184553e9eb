use std::path::{Path, PathBuf};

use crate::error::UploadError;

/// A file read into memory, ready to be posted as multipart
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub async fn load(path: &Path) -> Result<Self, UploadError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            file_name: display_name(path),
            bytes,
        })
    }
}

/// Last path component, or the whole path if it has none
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Selected file plus whether it is currently being processed.
///
/// The selection survives a failed upload so it can be submitted again.
#[derive(Debug, Default)]
pub struct UploadControl {
    selected: Option<PathBuf>,
    processing: bool,
}

impl UploadControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, path: impl Into<PathBuf>) {
        self.selected = Some(path.into());
    }

    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    pub fn selected_name(&self) -> Option<String> {
        self.selected.as_deref().map(display_name)
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Mark the control busy and return the path to submit.
    pub fn begin(&mut self) -> Result<PathBuf, UploadError> {
        if self.processing {
            return Err(UploadError::InProgress);
        }
        let path = self.selected.clone().ok_or(UploadError::NoFileSelected)?;
        self.processing = true;
        Ok(path)
    }

    pub fn finish(&mut self) {
        self.processing = false;
    }
}
