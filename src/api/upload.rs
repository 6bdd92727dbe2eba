use crate::config::CdnConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::MediaItem;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Pushes pending media to a hosting service
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload one data URI and return its public URL
    async fn upload(&self, data_uri: &str, file_name: &str) -> ApiResult<String>;
}

/// Unsigned direct-to-CDN upload using an upload preset
pub struct CdnUploader {
    client: Client,
    upload_url: String,
    preset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(alias = "url")]
    secure_url: String,
}

impl CdnUploader {
    /// `None` when no upload URL is configured
    pub fn from_config(config: &CdnConfig) -> anyhow::Result<Option<Self>> {
        let Some(upload_url) = config.upload_url.clone() else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create upload client")?;

        Ok(Some(Self {
            client,
            upload_url,
            preset: config.upload_preset.clone(),
        }))
    }
}

#[async_trait]
impl MediaUploader for CdnUploader {
    async fn upload(&self, data_uri: &str, file_name: &str) -> ApiResult<String> {
        debug!("Uploading {} ({} bytes encoded)", file_name, data_uri.len());

        let mut form = vec![("file", data_uri), ("public_id", file_name)];
        if let Some(preset) = &self.preset {
            form.push(("upload_preset", preset.as_str()));
        }

        let response = self.client.post(&self.upload_url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &body));
        }

        let parsed: UploadResponse =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        info!("Uploaded {}", file_name);
        Ok(parsed.secure_url)
    }
}

/// Replace every pending item with its uploaded URL
///
/// Stops at the first failure; items uploaded before it keep their
/// `Remote` form so a retry does not upload them again.
pub async fn resolve_media(uploader: &dyn MediaUploader, items: &mut [MediaItem]) -> ApiResult<usize> {
    let mut uploaded = 0;
    for item in items.iter_mut() {
        if let MediaItem::Local { data_uri, file_name, .. } = item {
            let url = uploader.upload(data_uri, file_name).await?;
            *item = MediaItem::remote(url);
            uploaded += 1;
        }
    }
    Ok(uploaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeUploader {
        uploaded: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl MediaUploader for FakeUploader {
        async fn upload(&self, _data_uri: &str, file_name: &str) -> ApiResult<String> {
            if self.fail_on.as_deref() == Some(file_name) {
                return Err(ApiError::QuotaExceeded("cdn".into()));
            }
            self.uploaded.lock().unwrap().push(file_name.to_string());
            Ok(format!("https://cdn.example.com/{}", file_name))
        }
    }

    #[tokio::test]
    async fn test_resolve_only_uploads_pending_items() {
        let uploader = FakeUploader { uploaded: Mutex::new(vec![]), fail_on: None };
        let mut items = vec![
            MediaItem::local("a.jpg", "image/jpeg", b"aaa"),
            MediaItem::remote("https://cdn.example.com/old.jpg"),
        ];

        let count = resolve_media(&uploader, &mut items).await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(items[0], MediaItem::remote("https://cdn.example.com/a.jpg"));
        assert_eq!(*uploader.uploaded.lock().unwrap(), vec!["a.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_keeps_progress_on_failure() {
        let uploader = FakeUploader { uploaded: Mutex::new(vec![]), fail_on: Some("b.jpg".into()) };
        let mut items = vec![
            MediaItem::local("a.jpg", "image/jpeg", b"a"),
            MediaItem::local("b.jpg", "image/jpeg", b"b"),
        ];

        let err = resolve_media(&uploader, &mut items).await.unwrap_err();

        assert!(err.is_quota_exceeded());
        assert!(!items[0].is_pending());
        assert!(items[1].is_pending());
    }

    #[test]
    fn test_no_uploader_without_url() {
        assert!(CdnUploader::from_config(&CdnConfig::default()).unwrap().is_none());
    }
}
