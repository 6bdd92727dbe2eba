//! Publish and edit flow for an agent's listings
//!
//! `Idle -> Editing -> Validating -> Submitting -> Success | Failure`.
//! Validation failures go straight back to `Editing` without touching the
//! network. A failed submit lands in `Failure`, which keeps the form so the
//! agent can fix things and submit again.

use crate::api::upload::{resolve_media, MediaUploader};
use crate::error::ApiError;
use crate::listing::form::{Field, ListingForm, MediaError, ValidationErrors};
use crate::listing::geo::{GeoError, GeoPoint, LocationProvider};
use crate::models::{MediaItem, Property};
use crate::notice::{self, Notice, NoticeKind};
use crate::session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

const TOAST_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    New,
    Existing(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishState {
    Idle,
    Editing(EditTarget),
    Validating(EditTarget),
    Submitting(EditTarget),
    Success(Property),
    Failure { target: EditTarget, message: String, quota_exceeded: bool },
}

impl PublishState {
    fn name(&self) -> &'static str {
        match self {
            PublishState::Idle => "idle",
            PublishState::Editing(_) => "editing",
            PublishState::Validating(_) => "validating",
            PublishState::Submitting(_) => "submitting",
            PublishState::Success(_) => "success",
            PublishState::Failure { .. } => "failure",
        }
    }

    /// The target being edited, in any state that still holds a form
    fn target(&self) -> Option<&EditTarget> {
        match self {
            PublishState::Editing(t) | PublishState::Validating(t) | PublishState::Submitting(t) => Some(t),
            PublishState::Failure { target, .. } => Some(target),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("No listing is being edited")]
    NotEditing,

    #[error("Sign in as an agent to manage listings")]
    NotSignedIn,

    #[error("Only the listing's agent can do that")]
    NotOwner,

    #[error("Please fix the highlighted fields: {0}")]
    Invalid(ValidationErrors),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl PublishError {
    pub fn user_message(&self) -> String {
        match self {
            PublishError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, PublishError::Api(e) if e.is_quota_exceeded())
    }
}

pub struct ListingWorkflow {
    state: PublishState,
    form: ListingForm,
    errors: ValidationErrors,
    uploader: Option<Arc<dyn MediaUploader>>,
    refresh: u64,
    toast: Option<Notice>,
}

impl ListingWorkflow {
    /// `uploader` pushes pending media to the CDN before submit; without it
    /// the data URIs are sent as they are
    pub fn new(uploader: Option<Arc<dyn MediaUploader>>) -> Self {
        Self {
            state: PublishState::Idle,
            form: ListingForm::default(),
            errors: ValidationErrors::default(),
            uploader,
            refresh: 0,
            toast: None,
        }
    }

    pub fn state(&self) -> &PublishState {
        &self.state
    }

    pub fn form(&self) -> &ListingForm {
        &self.form
    }

    /// Editable form, when one is open
    pub fn form_mut(&mut self) -> Option<&mut ListingForm> {
        self.state.target()?;
        Some(&mut self.form)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Bumped whenever listings change so views know to refetch
    pub fn refresh_counter(&self) -> u64 {
        self.refresh
    }

    pub fn toast(&mut self) -> Option<&Notice> {
        notice::visible(&mut self.toast)
    }

    fn transition(&mut self, next: PublishState) {
        debug!("Listing workflow {} -> {}", self.state.name(), next.name());
        self.state = next;
    }

    pub fn start_new(&mut self) {
        self.form = ListingForm::default();
        self.errors.clear();
        self.transition(PublishState::Editing(EditTarget::New));
    }

    pub fn start_edit(&mut self, property: &Property) {
        self.form = ListingForm::from_property(property);
        self.errors.clear();
        self.transition(PublishState::Editing(EditTarget::Existing(property.id.clone())));
    }

    /// Throw the form away
    pub fn cancel(&mut self) {
        self.form = ListingForm::default();
        self.errors.clear();
        self.transition(PublishState::Idle);
    }

    /// Leave `Success` for `Idle`, or `Failure` for `Editing`
    pub fn dismiss(&mut self) {
        match &self.state {
            PublishState::Success(_) => self.transition(PublishState::Idle),
            PublishState::Failure { target, .. } => {
                let target = target.clone();
                self.transition(PublishState::Editing(target));
            }
            _ => {}
        }
    }

    pub fn add_image(&mut self, item: MediaItem) -> Result<(), PublishError> {
        let form = self.form_mut().ok_or(PublishError::NotEditing)?;
        let result = form.add_image(item);
        self.record_media(Field::Images, result)
    }

    pub fn add_video(&mut self, item: MediaItem) -> Result<(), PublishError> {
        let form = self.form_mut().ok_or(PublishError::NotEditing)?;
        let result = form.add_video(item);
        self.record_media(Field::Videos, result)
    }

    fn record_media(&mut self, field: Field, result: Result<(), MediaError>) -> Result<(), PublishError> {
        match result {
            Ok(()) => {
                self.errors.remove(field);
                Ok(())
            }
            Err(e) => {
                warn!("Rejected media: {}", e);
                self.errors.insert(e.field(), e.to_string());
                Err(e.into())
            }
        }
    }

    /// Store the device position on the form
    ///
    /// Independent of submission: a failure is reported and nothing else
    /// changes.
    pub async fn pin_location(&mut self, provider: &dyn LocationProvider) -> Result<GeoPoint, GeoError> {
        if self.state.target().is_none() {
            return Err(GeoError::Unavailable("no listing is being edited".into()));
        }
        match provider.current_position().await {
            Ok(point) => {
                self.form.latitude = Some(point.latitude);
                self.form.longitude = Some(point.longitude);
                info!("Pinned listing at {}, {}", point.latitude, point.longitude);
                Ok(point)
            }
            Err(e) => {
                warn!("Could not get location: {}", e);
                self.toast = Some(Notice::new(NoticeKind::Error, e.to_string(), TOAST_TTL));
                Err(e)
            }
        }
    }

    /// Validate, upload pending media, then create or update the listing
    pub async fn submit(&mut self, session: &SessionStore) -> Result<Property, PublishError> {
        let target = self.state.target().cloned().ok_or(PublishError::NotEditing)?;
        if matches!(self.state, PublishState::Validating(_) | PublishState::Submitting(_)) {
            return Err(PublishError::NotEditing);
        }

        self.transition(PublishState::Validating(target.clone()));
        if let Err(errors) = self.form.validate() {
            info!("Listing has {} invalid field(s)", errors.len());
            self.errors = errors.clone();
            self.transition(PublishState::Editing(target));
            return Err(PublishError::Invalid(errors));
        }
        self.errors.clear();

        let Some(token) = session.token().map(str::to_string) else {
            self.transition(PublishState::Editing(target));
            return Err(PublishError::NotSignedIn);
        };

        self.transition(PublishState::Submitting(target.clone()));
        match self.send(session, &token, &target).await {
            Ok(property) => {
                info!("Published listing {}", property.id);
                self.form = ListingForm::default();
                self.refresh += 1;
                let message = match target {
                    EditTarget::New => "Listing published",
                    EditTarget::Existing(_) => "Listing updated",
                };
                self.toast = Some(Notice::new(NoticeKind::Success, message, TOAST_TTL));
                self.transition(PublishState::Success(property.clone()));
                Ok(property)
            }
            Err(e) => {
                error!("Publishing listing failed: {}", e);
                let message = e.user_message();
                self.toast = Some(Notice::new(NoticeKind::Error, message.clone(), TOAST_TTL));
                self.transition(PublishState::Failure {
                    target,
                    message,
                    quota_exceeded: e.is_quota_exceeded(),
                });
                Err(e)
            }
        }
    }

    async fn send(&mut self, session: &SessionStore, token: &str, target: &EditTarget) -> Result<Property, PublishError> {
        if let Some(uploader) = self.uploader.clone() {
            let (images, videos) = self.form.media_mut();
            let mut count = resolve_media(uploader.as_ref(), images).await?;
            count += resolve_media(uploader.as_ref(), videos).await?;
            debug!("Uploaded {} media file(s)", count);
        }

        let draft = self.form.to_draft().map_err(PublishError::Invalid)?;
        let api = session.api();
        let property = match target {
            EditTarget::New => api.create_property(token, &draft).await?,
            EditTarget::Existing(id) => api.update_property(token, id, &draft).await?,
        };
        Ok(property)
    }

    /// Remove a listing owned by the signed-in agent (or any, for admins)
    pub async fn delete(&mut self, session: &SessionStore, property: &Property) -> Result<(), PublishError> {
        let token = authorize(session, property)?;
        match session.api().delete_property(token, &property.id).await {
            Ok(()) => {
                info!("Deleted listing {}", property.id);
                self.refresh += 1;
                self.toast = Some(Notice::new(NoticeKind::Success, "Listing deleted", TOAST_TTL));
                Ok(())
            }
            Err(e) => {
                error!("Deleting listing {} failed: {}", property.id, e);
                self.toast = Some(Notice::new(NoticeKind::Error, e.user_message(), TOAST_TTL));
                Err(e.into())
            }
        }
    }

    /// Move a listing to its next status (Available, Pending, Sold)
    pub async fn cycle_status(&mut self, session: &SessionStore, property: &Property) -> Result<Property, PublishError> {
        let token = authorize(session, property)?;
        let next = property.status.next();
        match session.api().update_status(token, &property.id, next).await {
            Ok(updated) => {
                info!("Listing {} is now {}", updated.id, updated.status);
                self.refresh += 1;
                Ok(updated)
            }
            Err(e) => {
                error!("Status change on {} failed: {}", property.id, e);
                self.toast = Some(Notice::new(NoticeKind::Error, e.user_message(), TOAST_TTL));
                Err(e.into())
            }
        }
    }

    /// Flip the featured flag; admins only
    pub async fn toggle_featured(&mut self, session: &SessionStore, property: &Property) -> Result<Property, PublishError> {
        let user = session.current_user().ok_or(PublishError::NotSignedIn)?;
        if !user.is_admin() {
            return Err(PublishError::NotOwner);
        }
        let token = session.token().ok_or(PublishError::NotSignedIn)?;
        let updated = session.api().toggle_featured(token, &property.id).await?;
        self.refresh += 1;
        Ok(updated)
    }
}

/// Token for an owner or admin action on `property`
fn authorize<'a>(session: &'a SessionStore, property: &Property) -> Result<&'a str, PublishError> {
    let user = session.current_user().ok_or(PublishError::NotSignedIn)?;
    if !user.is_admin() && !property.is_owned_by(&user.id) {
        return Err(PublishError::NotOwner);
    }
    session.token().ok_or(PublishError::NotSignedIn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{user, FakeApi};
    use crate::api::upload::MediaUploader;
    use crate::error::ApiResult;
    use crate::listing::form::sample_form;
    use crate::listing::geo::{FixedLocation, NoLocation};
    use crate::models::{ListingType, PropertyStatus, Role};
    use crate::session::MemoryStorage;
    use async_trait::async_trait;

    async fn agent_session(api: Arc<FakeApi>) -> SessionStore {
        let mut session = SessionStore::new(api, Arc::new(MemoryStorage::default()));
        session.login("agent@example.com", "secret").await.unwrap();
        session
    }

    fn agent_api() -> Arc<FakeApi> {
        Arc::new(FakeApi::with_user(user("agent", Role::Agent)))
    }

    fn editing_with(form: ListingForm) -> ListingWorkflow {
        let mut wf = ListingWorkflow::new(None);
        wf.start_new();
        *wf.form_mut().unwrap() = form;
        wf
    }

    #[tokio::test]
    async fn test_publish_new_listing() {
        let api = agent_api();
        let session = agent_session(api.clone()).await;
        let mut wf = editing_with(sample_form());

        let property = wf.submit(&session).await.unwrap();

        assert_eq!(property.title, "Lekki Villa");
        assert!(matches!(wf.state(), PublishState::Success(_)));
        assert_eq!(wf.form(), &ListingForm::default());
        assert_eq!(wf.refresh_counter(), 1);
        assert_eq!(api.count("create_property"), 1);
        assert_eq!(wf.toast().map(|t| t.kind), Some(NoticeKind::Success));

        wf.dismiss();
        assert_eq!(wf.state(), &PublishState::Idle);
    }

    #[tokio::test]
    async fn test_land_without_plots_blocks_network() {
        let api = agent_api();
        let session = agent_session(api.clone()).await;
        let mut form = sample_form();
        form.listing_type = ListingType::Land;
        form.area = "600".into();
        let mut wf = editing_with(form);
        let calls_before = api.calls().len();

        let err = wf.submit(&session).await.unwrap_err();

        match err {
            PublishError::Invalid(errors) => assert!(errors.contains(Field::Plots)),
            other => panic!("unexpected error: {other}"),
        }
        assert!(wf.errors().contains(Field::Plots));
        assert_eq!(wf.state(), &PublishState::Editing(EditTarget::New));
        assert_eq!(api.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_failure_keeps_input_and_flags_quota() {
        let api = agent_api();
        api.fail_quota("create_property");
        let session = agent_session(api.clone()).await;
        let mut wf = editing_with(sample_form());

        let err = wf.submit(&session).await.unwrap_err();

        assert!(err.is_quota_exceeded());
        match wf.state() {
            PublishState::Failure { quota_exceeded, .. } => assert!(*quota_exceeded),
            other => panic!("unexpected state: {other:?}"),
        }
        assert_eq!(wf.form().title, "Lekki Villa");
        assert_eq!(wf.refresh_counter(), 0);

        api.heal("create_property");
        wf.submit(&session).await.unwrap();
        assert_eq!(wf.refresh_counter(), 1);
    }

    #[tokio::test]
    async fn test_edit_existing_calls_update() {
        let api = agent_api();
        let session = agent_session(api.clone()).await;
        let mut wf = editing_with(sample_form());
        let created = wf.submit(&session).await.unwrap();

        wf.start_edit(&created);
        wf.form_mut().unwrap().title = "Lekki Villa (renovated)".into();
        let updated = wf.submit(&session).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "Lekki Villa (renovated)");
        assert_eq!(api.count("update_property"), 1);
    }

    #[tokio::test]
    async fn test_submit_without_session() {
        let api = agent_api();
        let session = SessionStore::new(api.clone(), Arc::new(MemoryStorage::default()));
        let mut wf = editing_with(sample_form());

        assert!(matches!(wf.submit(&session).await, Err(PublishError::NotSignedIn)));
        assert_eq!(wf.state(), &PublishState::Editing(EditTarget::New));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_submit_when_idle() {
        let api = agent_api();
        let session = agent_session(api).await;
        let mut wf = ListingWorkflow::new(None);
        assert!(matches!(wf.submit(&session).await, Err(PublishError::NotEditing)));
    }

    #[tokio::test]
    async fn test_oversized_image_reported_inline() {
        let mut wf = ListingWorkflow::new(None);
        wf.start_new();
        let big = MediaItem::local("big.jpg", "image/jpeg", &vec![0u8; 600 * 1024]);

        assert!(matches!(wf.add_image(big), Err(PublishError::Media(_))));
        assert!(wf.errors().contains(Field::Images));

        wf.add_image(MediaItem::local("ok.jpg", "image/jpeg", b"ok")).unwrap();
        assert!(!wf.errors().contains(Field::Images));
    }

    #[tokio::test]
    async fn test_pin_location_is_optional() {
        let mut wf = editing_with(sample_form());

        assert!(wf.pin_location(&NoLocation).await.is_err());
        assert_eq!(wf.form().latitude, None);
        assert_eq!(wf.state(), &PublishState::Editing(EditTarget::New));

        let here = FixedLocation::new(6.45, 3.6).unwrap();
        wf.pin_location(&here).await.unwrap();
        assert_eq!(wf.form().latitude, Some(6.45));
        assert_eq!(wf.form().longitude, Some(3.6));
    }

    struct Cdn;

    #[async_trait]
    impl MediaUploader for Cdn {
        async fn upload(&self, _data_uri: &str, file_name: &str) -> ApiResult<String> {
            Ok(format!("https://cdn.example.com/{}", file_name))
        }
    }

    #[tokio::test]
    async fn test_uploader_replaces_data_uris() {
        let api = agent_api();
        let session = agent_session(api.clone()).await;
        let mut wf = ListingWorkflow::new(Some(Arc::new(Cdn)));
        wf.start_new();
        *wf.form_mut().unwrap() = sample_form();

        let property = wf.submit(&session).await.unwrap();

        assert_eq!(property.images, vec!["https://cdn.example.com/front.jpg".to_string()]);
        assert_eq!(property.videos, vec!["https://cdn.example.com/tour.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_only_owner_may_delete_or_cycle_status() {
        let api = agent_api();
        let session = agent_session(api.clone()).await;
        let mut wf = editing_with(sample_form());
        let mine = wf.submit(&session).await.unwrap();

        let mut theirs = mine.clone();
        theirs.agent.id = "other".into();
        theirs.agent.user_id = Some("other-user".into());
        assert!(matches!(wf.delete(&session, &theirs).await, Err(PublishError::NotOwner)));

        let updated = wf.cycle_status(&session, &mine).await.unwrap();
        assert_eq!(updated.status, PropertyStatus::Pending);

        wf.delete(&session, &mine).await.unwrap();
        assert!(api.properties.lock().unwrap().is_empty());
        assert_eq!(wf.refresh_counter(), 3);
    }

    #[tokio::test]
    async fn test_feature_toggle_is_admin_only() {
        let api = agent_api();
        let session = agent_session(api.clone()).await;
        let mut wf = editing_with(sample_form());
        let property = wf.submit(&session).await.unwrap();

        assert!(matches!(wf.toggle_featured(&session, &property).await, Err(PublishError::NotOwner)));

        let admin_api = Arc::new(FakeApi::with_user(user("root", Role::Admin)));
        admin_api.properties.lock().unwrap().push(property.clone());
        let mut admin = SessionStore::new(admin_api, Arc::new(MemoryStorage::default()));
        admin.login("root@example.com", "secret").await.unwrap();

        let featured = wf.toggle_featured(&admin, &property).await.unwrap();
        assert!(featured.featured);
    }
}
