// Uploaded image files on local disk.
use bytes::Bytes;
use rand::Rng;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, AppResult};

const NAME_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a stored file name to its path. Anything that is not a single
    /// plain path component is rejected.
    pub fn path_for(&self, file_name: &str) -> Option<PathBuf> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(self.dir.join(file_name)),
            _ => None,
        }
    }

    /// Write `data` under a freshly generated name and return that name.
    /// Never overwrites an existing file.
    pub async fn save(&self, extension: &str, data: &Bytes) -> io::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;

        for _ in 0..NAME_ATTEMPTS {
            let file_name = generate_file_name(extension);
            let path = self.dir.join(&file_name);
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };

            if let Err(e) = write_all(&mut file, data).await {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e);
            }
            return Ok(file_name);
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not find a free image file name",
        ))
    }

    pub async fn remove(&self, file_name: &str) -> io::Result<()> {
        match self.path_for(file_name) {
            Some(path) => tokio::fs::remove_file(path).await,
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid image file name",
            )),
        }
    }

    /// Remove files whose records are already gone. Failures are logged only.
    pub async fn remove_all(&self, file_names: &[String]) {
        for name in file_names {
            if let Err(e) = self.remove(name).await {
                tracing::warn!("Failed to remove image {}: {}", name, e);
            }
        }
    }

    /// Save the file, then run `record` with the stored name. If `record`
    /// fails the file is deleted again before the error is returned.
    pub async fn save_then<T, F>(&self, extension: &str, data: &Bytes, record: F) -> AppResult<T>
    where
        F: FnOnce(&str) -> AppResult<T>,
    {
        let file_name = self.save(extension, data).await?;

        match record(&file_name) {
            Ok(value) => Ok(value),
            Err(err) => {
                if let Err(e) = self.remove(&file_name).await {
                    tracing::warn!("Failed to remove orphaned image {}: {}", file_name, e);
                } else {
                    tracing::info!("Removed orphaned image {}", file_name);
                }
                Err(err)
            }
        }
    }
}

async fn write_all(file: &mut tokio::fs::File, data: &Bytes) -> io::Result<()> {
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await
}

/// `U<unix millis>-<random>.<ext>`
fn generate_file_name(extension: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("U{}-{}.{}", millis, suffix, extension)
}

/// Pick a safe lowercase extension from the client file name, falling back to
/// the content type.
pub fn image_extension(original_name: Option<&str>, content_type: Option<&str>) -> AppResult<String> {
    let from_name = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    let name_is_image = from_name
        .as_deref()
        .and_then(|ext| mime_guess::from_ext(ext).first())
        .map(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .unwrap_or(false);
    let declared_image = content_type
        .map(|ct| ct.starts_with("image/"))
        .unwrap_or(false);

    if !name_is_image && !declared_image {
        return Err(AppError::BadRequest("Uploaded file is not an image".into()));
    }

    match from_name {
        Some(ext) if name_is_image => Ok(ext),
        _ => content_type
            .and_then(mime_guess::get_mime_extensions_str)
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
            .ok_or_else(|| AppError::BadRequest("Unsupported image type".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_have_expected_shape() {
        let name = generate_file_name("jpg");
        assert!(name.starts_with('U'));
        assert!(name.ends_with(".jpg"));
        assert!(name.contains('-'));
        assert_ne!(name, generate_file_name("jpg"));
    }

    #[test]
    fn path_for_rejects_traversal() {
        let store = ImageStore::new("/srv/images");
        assert_eq!(
            store.path_for("U1-2.jpg"),
            Some(PathBuf::from("/srv/images/U1-2.jpg"))
        );
        assert!(store.path_for("../etc/passwd").is_none());
        assert!(store.path_for("a/b.jpg").is_none());
        assert!(store.path_for("/abs.jpg").is_none());
        assert!(store.path_for("").is_none());
    }

    #[test]
    fn extension_from_name_or_content_type() {
        assert_eq!(image_extension(Some("cat.JPG"), None).unwrap(), "jpg");
        assert_eq!(
            image_extension(Some("cat.png"), Some("image/png")).unwrap(),
            "png"
        );
        let from_type = image_extension(Some("blob"), Some("image/png")).unwrap();
        assert_eq!(from_type, "png");
        assert!(image_extension(Some("notes.txt"), Some("text/plain")).is_err());
        assert!(image_extension(None, None).is_err());
    }

    #[tokio::test]
    async fn save_and_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path().join("images"));
        let name = store.save("png", &Bytes::from_static(b"data")).await.unwrap();

        let path = store.path_for(&name).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"data");

        store.remove(&name).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn failed_record_removes_saved_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path());

        let mut saved = String::new();
        let result: AppResult<()> = store
            .save_then("jpg", &Bytes::from_static(b"img"), |name| {
                saved = name.to_string();
                Err(AppError::Internal("insert failed".into()))
            })
            .await;

        assert!(result.is_err());
        assert!(!saved.is_empty());
        assert!(!tmp.path().join(&saved).exists());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn successful_record_keeps_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path());

        let name = store
            .save_then("jpg", &Bytes::from_static(b"img"), |name| Ok(name.to_string()))
            .await
            .unwrap();
        assert!(tmp.path().join(name).exists());
    }
}
