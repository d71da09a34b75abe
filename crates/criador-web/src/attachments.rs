//! Photo bytes on the local filesystem.

use std::{io, path::PathBuf};

use axum::body::Bytes;
use criador_core::store::AttachmentStore;

/// Writes attachments under a fixed root directory.
#[derive(Debug, Clone)]
pub struct FsAttachmentStore {
  root: PathBuf,
}

impl FsAttachmentStore {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }
}

impl AttachmentStore for FsAttachmentStore {
  type Error = io::Error;

  async fn ensure_directory(&self, dir: PathBuf) -> io::Result<()> {
    tokio::fs::create_dir_all(self.root.join(dir)).await
  }

  async fn write_bytes(&self, path: PathBuf, bytes: Bytes) -> io::Result<()> {
    tokio::fs::write(self.root.join(path), bytes).await
  }
}
