//! Filesystem storage for post images.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

/// Directory under the media root that post images land in.
pub const POST_IMAGE_DIR: &str = "posts";

#[derive(Debug, Error)]
pub enum MediaStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
}

/// Result of storing an upload.
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Path relative to the media root, as persisted on the post.
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: u64,
}

/// Filesystem-backed media root.
#[derive(Debug)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    /// Open storage rooted at `root`, creating the directory if needed.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn store_post_image(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredImage, MediaStorageError> {
        if data.is_empty() {
            return Err(MediaStorageError::EmptyPayload);
        }

        let stored_path = build_stored_path(original_name);
        let absolute = self.resolve(&stored_path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&data).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        let checksum = hex::encode(Sha256::digest(&data));
        tracing::info!(
            target = "yatube::infra::uploads",
            path = %stored_path,
            size_bytes = data.len(),
            checksum = %checksum,
            "stored post image"
        );

        Ok(StoredImage {
            stored_path,
            checksum,
            size_bytes: data.len() as u64,
        })
    }

    pub async fn read(&self, stored_path: &str) -> Result<Bytes, MediaStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Missing files count as deleted.
    pub async fn delete(&self, stored_path: &str) -> Result<(), MediaStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(MediaStorageError::Io(err)),
        }
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, MediaStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(MediaStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

fn build_stored_path(original_name: &str) -> String {
    let identifier = Uuid::new_v4().simple();
    let filename = sanitize_filename(original_name);
    format!("{POST_IMAGE_DIR}/{identifier}-{filename}")
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("image");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "image".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_slugified() {
        assert_eq!(sanitize_filename("My Holiday Photo.JPG"), "my-holiday-photo.jpg");
        assert_eq!(sanitize_filename("???.png"), "image.png");
    }

    #[tokio::test]
    async fn stores_and_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = MediaStorage::new(dir.path().to_path_buf()).expect("storage");

        let stored = storage
            .store_post_image("cat.gif", Bytes::from_static(b"GIF89a"))
            .await
            .expect("store");
        assert!(stored.stored_path.starts_with("posts/"));
        assert!(stored.stored_path.ends_with("-cat.gif"));
        assert_eq!(stored.size_bytes, 6);

        let bytes = storage.read(&stored.stored_path).await.expect("read");
        assert_eq!(&bytes[..], b"GIF89a");

        storage.delete(&stored.stored_path).await.expect("delete");
        storage.delete(&stored.stored_path).await.expect("delete twice");
    }

    #[tokio::test]
    async fn rejects_escaping_paths_and_empty_payloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = MediaStorage::new(dir.path().to_path_buf()).expect("storage");

        assert!(matches!(
            storage.read("../secret").await,
            Err(MediaStorageError::InvalidPath)
        ));
        assert!(matches!(
            storage.read("/etc/passwd").await,
            Err(MediaStorageError::InvalidPath)
        ));
        assert!(matches!(
            storage.store_post_image("a.png", Bytes::new()).await,
            Err(MediaStorageError::EmptyPayload)
        ));
    }
}
