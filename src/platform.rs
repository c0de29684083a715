//! Platform capabilities used by the export path: temporary object URLs for
//! binary blobs and a "trigger download" primitive.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{QrError, Result};

const OBJECT_URL_PREFIX: &str = "blob:justqr/";

/// Binary content with its MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Blob {
    pub fn new(bytes: impl Into<Vec<u8>>, mime: impl Into<String>) -> Self {
        Self { bytes: bytes.into(), mime: mime.into() }
    }
}

pub trait Platform: Send + Sync + 'static {
    /// Registers `blob` and returns a URL that resolves to it until revoked.
    fn create_object_url(&self, blob: Blob) -> String;

    /// Releases a URL returned by [`Platform::create_object_url`].
    fn revoke_object_url(&self, url: &str);

    /// Starts a download of `href` (an object URL or `data:` URI) saved as
    /// `filename`.
    fn trigger_download(&self, filename: &str, href: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Platform that saves downloads into a directory on the local filesystem.
#[derive(Debug)]
pub struct FsPlatform {
    output_dir: PathBuf,
    object_urls: Mutex<HashMap<String, Blob>>,
}

impl FsPlatform {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into(), object_urls: Mutex::new(HashMap::new()) }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Number of object URLs created and not yet revoked.
    pub fn live_object_urls(&self) -> usize {
        self.urls().len()
    }

    fn urls(&self) -> MutexGuard<'_, HashMap<String, Blob>> {
        // A poisoned registry still holds valid blobs.
        self.object_urls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn resolve(&self, href: &str) -> Result<Vec<u8>> {
        if href.starts_with(OBJECT_URL_PREFIX) {
            return self
                .urls()
                .get(href)
                .map(|blob| blob.bytes.clone())
                .ok_or_else(|| QrError::UnknownObjectUrl(href.to_string()));
        }
        decode_data_uri(href)
    }
}

impl Platform for FsPlatform {
    fn create_object_url(&self, blob: Blob) -> String {
        let url = format!("{}{}", OBJECT_URL_PREFIX, Uuid::new_v4());
        debug!(%url, mime = %blob.mime, bytes = blob.bytes.len(), "created object URL");
        self.urls().insert(url.clone(), blob);
        url
    }

    fn revoke_object_url(&self, url: &str) {
        if self.urls().remove(url).is_some() {
            debug!(%url, "revoked object URL");
        }
    }

    async fn trigger_download(&self, filename: &str, href: &str) -> Result<()> {
        let bytes = self.resolve(href)?;

        if !self.output_dir.as_os_str().is_empty() && !self.output_dir.exists() {
            tokio::fs::create_dir_all(&self.output_dir).await?;
        }

        let path = self.output_dir.join(filename);
        tokio::fs::write(&path, &bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "saved download");
        Ok(())
    }
}

/// Decodes a base64 `data:<mime>;base64,<payload>` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| QrError::InvalidDataUri("missing data: scheme".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| QrError::InvalidDataUri("missing ',' separator".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(QrError::InvalidDataUri(format!("unsupported encoding in '{header}'")));
    }
    STANDARD
        .decode(payload)
        .map_err(|e| QrError::InvalidDataUri(e.to_string()))
}
