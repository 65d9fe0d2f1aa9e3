use std::path::Path;
use std::time::Duration;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Gateway to the object storage service. Objects live under
/// `{base_url}/{bucket}/{object_path}` and uploads are plain PUTs of the
/// file bytes.
#[derive(Clone)]
pub struct StorageClient {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    timeout: Duration,
}

impl StorageClient {
    pub fn new(base_url: String, bucket: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            bucket,
            timeout,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.storage_url.clone(),
            cfg.storage_bucket.clone(),
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    pub fn object_url(&self, object_path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.bucket, object_path)
    }

    /// Uploads a local file to the bucket and returns its public URL.
    pub async fn upload(
        &self,
        local_path: &Path,
        object_path: &str,
    ) -> Result<String, StorageError> {
        let bytes = tokio::fs::read(local_path).await?;
        let url = self.object_url(object_path);

        let response = self
            .client
            .put(&url)
            .timeout(self.timeout)
            .header("content-type", "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        tracing::info!("Uploaded {} to {}", local_path.display(), url);
        Ok(url)
    }

    /// Downloads an object into a local file.
    pub async fn download(&self, object_path: &str, local_path: &Path) -> Result<(), StorageError> {
        let url = self.object_url(object_path);
        let response = self.client.get(&url).timeout(self.timeout).send().await?;

        if !response.status().is_success() {
            return Err(StorageError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(local_path, &bytes).await?;
        tracing::info!("Downloaded {} to {}", url, local_path.display());
        Ok(())
    }
}

/// Sanitizes a filename: strips characters invalid on common filesystems,
/// collapses whitespace runs to underscores, lowercases, and truncates.
pub fn sanitize_filename(filename: &str, max_length: usize) -> String {
    const INVALID: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    let mut out = String::with_capacity(filename.len());
    let mut in_whitespace = false;
    for c in filename.chars() {
        if INVALID.contains(&c) {
            continue;
        }
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        for lower in c.to_lowercase() {
            out.push(lower);
        }
    }
    out.chars().take(max_length).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_invalid_characters_and_lowercases() {
        let out = sanitize_filename("Q: What/Why? <2024>", 100);
        for c in ['<', '>', ':', '"', '/', '\\', '|', '?', '*'] {
            assert!(!out.contains(c), "{:?} should not contain {:?}", out, c);
        }
        assert!(!out.contains(' '));
        assert_eq!(out, out.to_lowercase());
    }

    #[test]
    fn collapses_whitespace_to_single_underscore() {
        assert_eq!(sanitize_filename("a  b\tc", 100), "a_b_c");
    }

    #[test]
    fn truncates_to_max_length() {
        let out = sanitize_filename(&"a".repeat(200), 100);
        assert_eq!(out.len(), 100);
    }

    #[test]
    fn object_url_joins_bucket_and_path() {
        let client = StorageClient::new(
            "http://localhost:9000".to_string(),
            "evidence".to_string(),
            std::time::Duration::from_secs(5),
        );
        assert_eq!(
            client.object_url("images/x.png"),
            "http://localhost:9000/evidence/images/x.png"
        );
    }
}
