use std::path::PathBuf;

use anyhow::bail;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tokio::fs::{create_dir_all, remove_file, File};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::config::StorageConfig;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Object storage for student photos, addressed by key.
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    async fn upload(&self, key: &str, body: Vec<u8>, content_type: &str) -> anyhow::Result<()>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// Public URL the stored object is served from.
    fn url_for(&self, key: &str) -> String;
}

/// Lowercased extension of `file_name` when it is an accepted image type.
pub fn allowed_extension(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.iter().copied().find(|allowed| *allowed == ext)
}

pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        _ => "image/jpeg",
    }
}

/// Object key of a stored photo URL: its last path segment.
pub fn key_from_url(url: &str) -> Option<&str> {
    let key = url.trim().rsplit('/').next()?;
    if key.is_empty() || key == "." || key == ".." || key.contains('\\') {
        return None;
    }
    Some(key)
}

pub async fn delete_by_url(storage: &dyn PhotoStorage, url: &str) -> anyhow::Result<()> {
    match key_from_url(url) {
        Some(key) => storage.delete(key).await,
        None => bail!("No object key in url `{}`", url),
    }
}

/// Keeps photos in a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    config: StorageConfig,
}

impl LocalStorage {
    pub async fn prepare(config: StorageConfig) -> anyhow::Result<Self> {
        let root = PathBuf::from(&config.local_dir);
        create_dir_all(&root).await?;
        log::info!("Storing photos under {}", root.display());
        Ok(Self { root, config })
    }
}

#[async_trait]
impl PhotoStorage for LocalStorage {
    async fn upload(&self, key: &str, body: Vec<u8>, _content_type: &str) -> anyhow::Result<()> {
        let path = self.root.join(key);
        let mut writer = BufWriter::new(File::create(path).await?);
        writer.write_all(&body).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let path = self.root.join(key);
        if !path.exists() {
            bail!("Tried to delete nonexistent file `{}`!", key)
        }
        remove_file(path).await?;
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        self.config.url_for(key)
    }
}

/// Keeps photos in an S3 bucket; credentials come from the standard AWS
/// environment.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    config: StorageConfig,
}

impl S3Storage {
    pub async fn from_env(config: StorageConfig) -> Self {
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        log::info!("Storing photos in S3 bucket {}", config.bucket);
        Self {
            client: aws_sdk_s3::Client::new(&aws),
            config,
        }
    }
}

#[async_trait]
impl PhotoStorage for S3Storage {
    async fn upload(&self, key: &str, body: Vec<u8>, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        self.config.url_for(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use std::path::Path;

    fn config(dir: &Path) -> StorageConfig {
        StorageConfig {
            backend: StorageBackend::Local,
            bucket: "thingaha".to_string(),
            url_template: "http://localhost/{bucket}/{key}".to_string(),
            local_dir: dir.to_string_lossy().into_owned(),
        }
    }

    #[test]
    fn extension_allow_list() {
        assert_eq!(allowed_extension("me.png"), Some("png"));
        assert_eq!(allowed_extension("me.JPG"), Some("jpg"));
        assert_eq!(allowed_extension("a.b.jpeg"), Some("jpeg"));
        assert_eq!(allowed_extension("me.gif"), None);
        assert_eq!(allowed_extension("png"), None);
    }

    #[test]
    fn keys_come_from_last_segment() {
        assert_eq!(
            key_from_url("https://thingaha.s3.amazonaws.com/12.png"),
            Some("12.png")
        );
        assert_eq!(key_from_url("https://host/photos/"), None);
        assert_eq!(key_from_url("https://host/.."), None);
    }

    #[tokio::test]
    async fn local_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::prepare(config(dir.path())).await.unwrap();

        storage.upload("4.png", vec![1, 2, 3], "image/png").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("4.png")).unwrap(), vec![1, 2, 3]);
        assert_eq!(storage.url_for("4.png"), "http://localhost/thingaha/4.png");

        delete_by_url(&storage, "http://localhost/thingaha/4.png")
            .await
            .unwrap();
        assert!(!dir.path().join("4.png").exists());
        assert!(storage.delete("4.png").await.is_err());
    }
}
