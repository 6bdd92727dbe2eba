//! Optimistic like/save toggle
//!
//! The heart flips and the counter moves before the backend answers. A
//! failed call puts both back to what they were before that toggle.

use crate::api::RemoteApi;
use crate::error::{ApiError, ApiResult};
use crate::models::{Property, User};
use crate::notice::{self, Notice, NoticeKind, PROMPT_TTL};
use crate::session::SessionStore;
use tracing::{debug, warn};

pub const SIGN_IN_PROMPT: &str = "Sign in to save properties you like.";

/// A value shown before confirmation, with the snapshot to fall back to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Optimistic<T> {
    value: T,
    before: Option<T>,
}

impl<T: Copy> Optimistic<T> {
    pub fn settled(value: T) -> Self {
        Self { value, before: None }
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn is_pending(&self) -> bool {
        self.before.is_some()
    }

    /// Show `f(value)` while remembering the current value
    pub fn apply(self, f: impl FnOnce(T) -> T) -> Self {
        Self {
            value: f(self.value),
            before: Some(self.value),
        }
    }

    pub fn confirm(self) -> Self {
        Self::settled(self.value)
    }

    /// Fall back to the remembered value
    pub fn undo(self) -> Self {
        Self::settled(self.before.unwrap_or(self.value))
    }
}

/// What the like button shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub count: u32,
}

impl LikeState {
    pub fn toggled(self) -> Self {
        if self.liked {
            Self {
                liked: false,
                count: self.count.saturating_sub(1),
            }
        } else {
            Self {
                liked: true,
                count: self.count + 1,
            }
        }
    }
}

/// An in-flight toggle, carrying what it needs to finish or roll back
#[derive(Debug, Clone)]
pub struct PendingToggle {
    pub property_id: String,
    /// Whether the property should end up saved
    pub save: bool,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Saved,
    Removed,
    SignInRequired,
    Failed,
}

/// Like button state for one property
#[derive(Debug, Clone)]
pub struct LikeButton {
    property_id: String,
    state: Optimistic<LikeState>,
    generation: u64,
    prompt: Option<Notice>,
    error: Option<String>,
}

impl LikeButton {
    pub fn new(property: &Property, user: Option<&User>) -> Self {
        Self {
            property_id: property.id.clone(),
            state: Optimistic::settled(LikeState {
                liked: user.is_some_and(|u| u.has_saved(&property.id)),
                count: property.likes,
            }),
            generation: 0,
            prompt: None,
            error: None,
        }
    }

    pub fn state(&self) -> LikeState {
        self.state.value()
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    /// Sign-in prompt, while it has not yet timed out
    pub fn prompt(&mut self) -> Option<&Notice> {
        notice::visible(&mut self.prompt)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Apply the optimistic flip, or raise the sign-in prompt
    ///
    /// Returns `None` when nobody is signed in; nothing else changes.
    pub fn begin(&mut self, session: &SessionStore) -> Option<PendingToggle> {
        if !session.is_authenticated() {
            debug!("Like on {} without session", self.property_id);
            self.prompt = Some(Notice::new(NoticeKind::Info, SIGN_IN_PROMPT, PROMPT_TTL));
            return None;
        }

        self.error = None;
        self.generation += 1;
        self.state = self.state.apply(LikeState::toggled);

        Some(PendingToggle {
            property_id: self.property_id.clone(),
            save: self.state.value().liked,
            generation: self.generation,
        })
    }

    /// Settle a toggle with the backend's answer
    ///
    /// Only the newest toggle may roll the button back. An older one failing
    /// after a newer click leaves the newer state on screen.
    pub fn finish(&mut self, toggle: &PendingToggle, result: &ApiResult<()>) -> ToggleOutcome {
        let latest = toggle.generation == self.generation;
        match result {
            Ok(()) => {
                if latest {
                    self.state = self.state.confirm();
                }
                if toggle.save {
                    ToggleOutcome::Saved
                } else {
                    ToggleOutcome::Removed
                }
            }
            Err(e) => {
                warn!("Like toggle on {} failed: {}", toggle.property_id, e);
                if latest {
                    self.state = self.state.undo();
                }
                self.error = Some(e.user_message());
                ToggleOutcome::Failed
            }
        }
    }

    /// Full toggle: flip, call the backend, settle, and update the saved list
    pub async fn toggle(&mut self, session: &mut SessionStore) -> ToggleOutcome {
        let Some(pending) = self.begin(session) else {
            return ToggleOutcome::SignInRequired;
        };

        let result = send(session.api().as_ref(), session.token(), &pending).await;
        let outcome = self.finish(&pending, &result);

        if result.is_ok() {
            record_saved(session, &pending).await;
        }
        outcome
    }
}

/// Issue the add or remove call for a toggle
pub async fn send(api: &dyn RemoteApi, token: Option<&str>, toggle: &PendingToggle) -> ApiResult<()> {
    let token = token.ok_or(ApiError::Unauthorized)?;
    if toggle.save {
        api.save_property(token, &toggle.property_id).await
    } else {
        api.unsave_property(token, &toggle.property_id).await
    }
}

/// Mirror a confirmed toggle into the session user's saved list
pub async fn record_saved(session: &mut SessionStore, toggle: &PendingToggle) {
    if let Some(user) = session.current_user_mut() {
        user.set_saved(&toggle.property_id, toggle.save);
    }
    if let Err(e) = session.persist().await {
        warn!("Could not persist saved list: {}", e);
    }
}
