use crate::api::types::{AuthSession, ProfileUpdate, PropertyDraft, PropertyQuery, RegisterRequest};
use crate::error::ApiResult;
use crate::models::{Agent, Property, PropertyStatus, Rating, User};
use async_trait::async_trait;

/// Everything the client needs from the backend
///
/// `RestClient` talks HTTP; tests swap in an in-memory fake. Calls that act
/// on behalf of a user take the session's bearer token.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> ApiResult<AuthSession>;

    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthSession>;

    /// Current user for a token
    async fn me(&self, token: &str) -> ApiResult<User>;

    async fn forgot_password(&self, email: &str) -> ApiResult<()>;

    async fn reset_password(&self, reset_token: &str, new_password: &str) -> ApiResult<()>;

    async fn delete_account(&self, token: &str) -> ApiResult<()>;

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> ApiResult<User>;

    async fn save_property(&self, token: &str, property_id: &str) -> ApiResult<()>;

    async fn unsave_property(&self, token: &str, property_id: &str) -> ApiResult<()>;

    async fn list_properties(&self, query: &PropertyQuery) -> ApiResult<Vec<Property>>;

    async fn get_property(&self, id: &str) -> ApiResult<Property>;

    async fn create_property(&self, token: &str, draft: &PropertyDraft) -> ApiResult<Property>;

    async fn update_property(&self, token: &str, id: &str, draft: &PropertyDraft) -> ApiResult<Property>;

    async fn update_status(&self, token: &str, id: &str, status: PropertyStatus) -> ApiResult<Property>;

    async fn delete_property(&self, token: &str, id: &str) -> ApiResult<()>;

    /// Every listing regardless of owner; admin only
    async fn admin_list_properties(&self, token: &str) -> ApiResult<Vec<Property>>;

    async fn toggle_featured(&self, token: &str, id: &str) -> ApiResult<Property>;

    async fn get_agent(&self, id: &str) -> ApiResult<Agent>;

    async fn list_agents(&self) -> ApiResult<Vec<Agent>>;

    /// Submit a star rating, returning the recomputed aggregate
    async fn rate_agent(&self, token: &str, agent_id: &str, stars: u8) -> ApiResult<Rating>;
}
