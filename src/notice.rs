use std::time::Duration;
use tokio::time::Instant;

/// How long the sign-in prompt stays up
pub const PROMPT_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// A toast that hides itself after a while
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    expires_at: Instant,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            kind,
            message: message.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_visible(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Drop the notice once it has expired, returning what is still showing
pub fn visible(slot: &mut Option<Notice>) -> Option<&Notice> {
    if slot.as_ref().is_some_and(|n| !n.is_visible()) {
        *slot = None;
    }
    slot.as_ref()
}
