//! Album persistence.
//!
//! One backend is chosen at startup and every record lives under its slug:
//! `{root}/{slug}.json` on disk, `{base}/books/{slug}.json` on the blob
//! store. Records are immutable once written, so there is no update path and
//! no locking; a write is a fresh key, a read is a point lookup.
//!
//! Absence is a value here, not an error: `read_record` returns `Ok(None)`
//! only when the backend positively reports the key missing (`NotFound` on
//! disk, HTTP 404 remotely). Anything else, including a record that exists
//! but does not parse, surfaces as [`StoreError`] so callers never confuse
//! an outage with a dead link.

use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::album::AlbumRecord;
use crate::error::StoreError;

/// Where filesystem-backed albums land when no directory is configured.
pub const DEFAULT_DATA_DIR: &str = "data/books";

const BLOB_KEY_PREFIX: &str = "books";

// ── Store selection ─────────────────────────────────────────────────────────

/// Persistence backend for published albums.
pub enum AlbumStore {
    Filesystem(FsStore),
    Blob(BlobStore),
}

impl AlbumStore {
    /// Store records as JSON files under `root`.
    pub fn filesystem(root: impl Into<PathBuf>) -> Self {
        AlbumStore::Filesystem(FsStore { root: root.into() })
    }

    /// Store records on an HTTP blob service rooted at `base_url`,
    /// authenticating every request with `token`.
    pub fn remote(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        AlbumStore::Blob(BlobStore {
            client: reqwest::Client::new(),
            base_url,
            token: token.into(),
        })
    }

    /// Pick a backend from the environment: the blob store when both
    /// `BOOKLEAF_BLOB_URL` and `BOOKLEAF_BLOB_TOKEN` are set, otherwise the
    /// filesystem at `BOOKLEAF_DATA_DIR` (default `data/books`).
    pub fn from_env() -> Self {
        let blob_url = non_empty_env("BOOKLEAF_BLOB_URL");
        let blob_token = non_empty_env("BOOKLEAF_BLOB_TOKEN");
        match (blob_url, blob_token) {
            (Some(url), Some(token)) => {
                info!("Using blob store at {}", url);
                Self::remote(url, token)
            }
            (Some(_), None) | (None, Some(_)) => {
                warn!(
                    "BOOKLEAF_BLOB_URL and BOOKLEAF_BLOB_TOKEN must both be set; \
                     falling back to the filesystem store"
                );
                Self::filesystem(data_dir_from_env())
            }
            (None, None) => Self::filesystem(data_dir_from_env()),
        }
    }

    /// Human-readable backend description for logs and `--verbose` output.
    pub fn describe(&self) -> String {
        match self {
            AlbumStore::Filesystem(fs) => format!("filesystem ({})", fs.root.display()),
            AlbumStore::Blob(blob) => format!("blob store ({})", blob.base_url),
        }
    }

    /// Persist `record` under `slug`.
    pub async fn write_record(&self, slug: &str, record: &AlbumRecord) -> Result<(), StoreError> {
        match self {
            AlbumStore::Filesystem(fs) => fs.write(slug, record).await,
            AlbumStore::Blob(blob) => blob.write(slug, record).await,
        }
    }

    /// Fetch the record under `slug`, or `None` when no such record exists.
    pub async fn read_record(&self, slug: &str) -> Result<Option<AlbumRecord>, StoreError> {
        match self {
            AlbumStore::Filesystem(fs) => fs.read(slug).await,
            AlbumStore::Blob(blob) => blob.read(slug).await,
        }
    }

    /// Cheap existence probe used for slug collision checks. Does not fetch
    /// or parse the record body.
    pub async fn record_exists(&self, slug: &str) -> Result<bool, StoreError> {
        match self {
            AlbumStore::Filesystem(fs) => fs.exists(slug).await,
            AlbumStore::Blob(blob) => blob.exists(slug).await,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn data_dir_from_env() -> String {
    non_empty_env("BOOKLEAF_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
}

// ── Filesystem backend ──────────────────────────────────────────────────────

/// JSON files under a root directory, one per album.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    async fn write(&self, slug: &str, record: &AlbumRecord) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let bytes = serde_json::to_vec_pretty(record)?;
        let final_path = self.root.join(format!("{slug}.json"));

        // Temp file in the target directory, then an atomic rename, so a
        // crash never leaves a half-written album visible under its final
        // name. `NamedTempFile` cleans itself up on any failure path.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&final_path).map_err(|e| StoreError::Io(e.error))?;

        debug!("Wrote {} ({} bytes)", final_path.display(), bytes.len());
        Ok(())
    }

    async fn read(&self, slug: &str) -> Result<Option<AlbumRecord>, StoreError> {
        let path = self.root.join(format!("{slug}.json"));
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, slug: &str) -> Result<bool, StoreError> {
        let path = self.root.join(format!("{slug}.json"));
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

// ── Blob backend ────────────────────────────────────────────────────────────

/// HTTP blob service speaking plain PUT/GET with bearer authentication.
pub struct BlobStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl BlobStore {
    fn record_url(&self, slug: &str) -> String {
        format!("{}/{}/{}.json", self.base_url, BLOB_KEY_PREFIX, slug)
    }

    fn record_key(slug: &str) -> String {
        format!("{BLOB_KEY_PREFIX}/{slug}.json")
    }

    async fn write(&self, slug: &str, record: &AlbumRecord) -> Result<(), StoreError> {
        let body = serde_json::to_vec(record)?;
        let response = self
            .client
            .put(self.record_url(slug))
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::UnexpectedStatus {
                key: Self::record_key(slug),
                status: status.as_u16(),
            });
        }
        debug!("Uploaded {}", Self::record_key(slug));
        Ok(())
    }

    async fn read(&self, slug: &str) -> Result<Option<AlbumRecord>, StoreError> {
        let response = self
            .client
            .get(self.record_url(slug))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StoreError::UnexpectedStatus {
                key: Self::record_key(slug),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn exists(&self, slug: &str) -> Result<bool, StoreError> {
        let response = self
            .client
            .head(self.record_url(slug))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(StoreError::UnexpectedStatus {
                key: Self::record_key(slug),
                status: status.as_u16(),
            });
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album::{AlbumMetadata, Orientation, Page};
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_record(slug: &str) -> AlbumRecord {
        let page = Page {
            id: "page000000000001".to_string(),
            index: 0,
            name: "cover.jpg".to_string(),
            width: 100,
            height: 150,
            dpi: 300,
            orientation: Orientation::Portrait,
            image_data: "data:image/jpeg;base64,AAAA".to_string(),
            thumbnail_data: "data:image/jpeg;base64,BBBB".to_string(),
            ocr_text: None,
        };
        AlbumRecord {
            metadata: AlbumMetadata {
                id: "albumid00001".to_string(),
                title: "Store Test".to_string(),
                created_at: Utc::now(),
                page_count: 1,
                dominant_orientation: Orientation::Portrait,
                double_page_spreads: vec![],
                short_url: format!("http://localhost:3000/book/{slug}"),
                slug: slug.to_string(),
                thumbnail: "data:image/jpeg;base64,BBBB".to_string(),
            },
            pages: vec![page],
        }
    }

    #[tokio::test]
    async fn roundtrips_a_record_through_the_filesystem() {
        let dir = TempDir::new().unwrap();
        let store = AlbumStore::filesystem(dir.path());
        let record = sample_record("abcd1234");

        store.write_record("abcd1234", &record).await.unwrap();
        let loaded = store.read_record("abcd1234").await.unwrap().unwrap();

        assert_eq!(loaded.metadata.slug, "abcd1234");
        assert_eq!(loaded.metadata.title, "Store Test");
        assert_eq!(loaded.pages.len(), 1);
        assert_eq!(loaded.pages[0].name, "cover.jpg");
    }

    #[tokio::test]
    async fn missing_record_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = AlbumStore::filesystem(dir.path());
        assert!(store.read_record("nosuchid").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_record_is_an_error_not_absence() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken12.json"), b"{ not json ]").unwrap();

        let store = AlbumStore::filesystem(dir.path());
        let result = store.read_record("broken12").await;
        assert!(matches!(result, Err(StoreError::Json(_))));
    }

    #[tokio::test]
    async fn write_leaves_no_temp_files_behind() {
        let dir = TempDir::new().unwrap();
        let store = AlbumStore::filesystem(dir.path());
        store
            .write_record("abcd1234", &sample_record("abcd1234"))
            .await
            .unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["abcd1234.json"], "stray files: {entries:?}");
    }

    #[tokio::test]
    async fn exists_tracks_written_records() {
        let dir = TempDir::new().unwrap();
        let store = AlbumStore::filesystem(dir.path());

        assert!(!store.record_exists("abcd1234").await.unwrap());
        store
            .write_record("abcd1234", &sample_record("abcd1234"))
            .await
            .unwrap();
        assert!(store.record_exists("abcd1234").await.unwrap());
    }

    #[tokio::test]
    async fn write_creates_the_root_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deep").join("books");
        let store = AlbumStore::filesystem(&nested);

        store
            .write_record("abcd1234", &sample_record("abcd1234"))
            .await
            .unwrap();
        assert!(nested.join("abcd1234.json").is_file());
    }

    #[test]
    fn blob_urls_are_rooted_under_the_books_prefix() {
        let store = AlbumStore::remote("https://blob.example.com/", "token");
        let AlbumStore::Blob(blob) = &store else {
            panic!("expected blob backend");
        };
        assert_eq!(
            blob.record_url("abcd1234"),
            "https://blob.example.com/books/abcd1234.json"
        );
        assert_eq!(BlobStore::record_key("abcd1234"), "books/abcd1234.json");
    }

    #[test]
    fn from_env_selects_the_backend() {
        // Mutates the process environment, so every branch is asserted here
        // sequentially instead of across parallel tests.
        std::env::remove_var("BOOKLEAF_BLOB_URL");
        std::env::remove_var("BOOKLEAF_BLOB_TOKEN");
        std::env::remove_var("BOOKLEAF_DATA_DIR");
        assert_eq!(
            AlbumStore::from_env().describe(),
            format!("filesystem ({DEFAULT_DATA_DIR})")
        );

        std::env::set_var("BOOKLEAF_DATA_DIR", "alt/books");
        assert_eq!(AlbumStore::from_env().describe(), "filesystem (alt/books)");

        // Half a blob configuration falls back to the filesystem.
        std::env::set_var("BOOKLEAF_BLOB_URL", "https://blob.example.com");
        assert!(AlbumStore::from_env().describe().starts_with("filesystem"));

        std::env::set_var("BOOKLEAF_BLOB_TOKEN", "secret");
        assert_eq!(
            AlbumStore::from_env().describe(),
            "blob store (https://blob.example.com)"
        );

        std::env::remove_var("BOOKLEAF_BLOB_URL");
        assert!(AlbumStore::from_env().describe().starts_with("filesystem"));

        std::env::remove_var("BOOKLEAF_BLOB_TOKEN");
        std::env::remove_var("BOOKLEAF_DATA_DIR");
    }

    #[test]
    fn describe_names_the_backend() {
        let fs = AlbumStore::filesystem("data/books");
        assert!(fs.describe().starts_with("filesystem"));

        let blob = AlbumStore::remote("https://blob.example.com", "t");
        assert!(blob.describe().contains("blob.example.com"));
    }
}
