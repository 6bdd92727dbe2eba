pub mod client;
pub mod dto;
pub mod traits;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod fake;

pub use client::RestClient;
pub use traits::RemoteApi;
pub use types::{AuthSession, ProfileUpdate, PropertyDraft, PropertyQuery, RegisterRequest};
pub use upload::{CdnUploader, MediaUploader};
