use crate::error::ApiError;
use crate::models::{Agent, Rating};
use crate::session::SessionStore;
use thiserror::Error;
use tracing::{error, info};

pub const MIN_STARS: u8 = 1;
pub const MAX_STARS: u8 = 5;

#[derive(Error, Debug)]
pub enum RatingError {
    #[error("Sign in to rate agents")]
    NotSignedIn,

    #[error("You cannot rate yourself")]
    OwnProfile,

    #[error("Pick between 1 and 5 stars")]
    OutOfRange,

    #[error("The rating dialog is not open")]
    Closed,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Star-rating dialog for one agent, holding the cached profile
#[derive(Debug, Clone)]
pub struct RatingModal {
    agent: Agent,
    open: bool,
    stars: u8,
}

impl RatingModal {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            open: false,
            stars: 0,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn stars(&self) -> u8 {
        self.stars
    }

    /// Open the dialog; the agent themself never gets it
    pub fn open(&mut self, session: &SessionStore) -> Result<(), RatingError> {
        let user = session.current_user().ok_or(RatingError::NotSignedIn)?;
        if self.agent.is_owned_by(&user.id) {
            return Err(RatingError::OwnProfile);
        }
        self.open = true;
        self.stars = 0;
        Ok(())
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn set_stars(&mut self, stars: u8) {
        self.stars = stars;
    }

    /// Whether the submit button is enabled
    pub fn can_submit(&self) -> bool {
        self.open && (MIN_STARS..=MAX_STARS).contains(&self.stars)
    }

    /// Send the rating and adopt the recomputed average
    ///
    /// On failure the dialog stays open with the chosen stars so the user
    /// can try again.
    pub async fn submit(&mut self, session: &SessionStore) -> Result<Rating, RatingError> {
        if !self.open {
            return Err(RatingError::Closed);
        }
        if !self.can_submit() {
            return Err(RatingError::OutOfRange);
        }
        let token = session.token().ok_or(RatingError::NotSignedIn)?;

        match session.api().rate_agent(token, &self.agent.id, self.stars).await {
            Ok(rating) => {
                info!(
                    "Rated agent {} with {} stars, now {:.1} over {}",
                    self.agent.id, self.stars, rating.average, rating.count
                );
                self.agent.rating = rating;
                self.open = false;
                Ok(rating)
            }
            Err(e) => {
                error!("Rating agent {} failed: {}", self.agent.id, e);
                Err(e.into())
            }
        }
    }
}
