use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// A media attachment on a listing form
///
/// `Local` items are still waiting for upload and carry a base64 data URI
/// that can stand in for the final URL. They become `Remote` only once the
/// upload has been confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MediaItem {
    Local {
        file_name: String,
        mime_type: String,
        size: u64,
        data_uri: String,
    },
    Remote {
        url: String,
    },
}

impl MediaItem {
    /// Encode raw file bytes into a pending upload
    pub fn local(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        let mime_type = mime_type.into();
        let data_uri = format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes));
        MediaItem::Local {
            file_name: file_name.into(),
            mime_type,
            size: bytes.len() as u64,
            data_uri,
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        MediaItem::Remote { url: url.into() }
    }

    /// URL to send to the backend; data URI for pending uploads
    pub fn url(&self) -> &str {
        match self {
            MediaItem::Local { data_uri, .. } => data_uri,
            MediaItem::Remote { url } => url,
        }
    }

    /// Byte size, known only for local files
    pub fn size(&self) -> Option<u64> {
        match self {
            MediaItem::Local { size, .. } => Some(*size),
            MediaItem::Remote { .. } => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MediaItem::Local { .. })
    }
}
