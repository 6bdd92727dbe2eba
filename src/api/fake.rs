//! In-memory backend used by the test suites

use crate::api::traits::RemoteApi;
use crate::api::types::{AuthSession, ProfileUpdate, PropertyDraft, PropertyQuery, RegisterRequest};
use crate::error::{ApiError, ApiResult};
use crate::models::{Agent, AgentRef, Location, Property, PropertyStatus, Rating, Role, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

pub const TOKEN: &str = "token-1";

#[derive(Default)]
pub struct FakeApi {
    pub properties: Mutex<Vec<Property>>,
    pub agents: Mutex<Vec<Agent>>,
    pub user: Mutex<Option<User>>,
    /// Names of calls made, in order
    pub calls: Mutex<Vec<String>>,
    /// Operations that fail with a 500
    failing: Mutex<HashSet<&'static str>>,
    /// Operations that fail with a quota error
    quota: Mutex<HashSet<&'static str>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: User) -> Self {
        let api = Self::default();
        *api.user.lock().unwrap() = Some(user);
        api
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn fail_quota(&self, op: &'static str) {
        self.quota.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
        self.quota.lock().unwrap().remove(op);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.as_str() == op).count()
    }

    async fn enter(&self, op: &'static str) -> ApiResult<()> {
        self.calls.lock().unwrap().push(op.to_string());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.quota.lock().unwrap().contains(op) {
            return Err(ApiError::QuotaExceeded("storage quota exceeded".into()));
        }
        if self.failing.lock().unwrap().contains(op) {
            return Err(ApiError::Remote {
                status: 500,
                message: Some(format!("{} failed", op)),
            });
        }
        Ok(())
    }

    fn check_token(&self, token: &str) -> ApiResult<User> {
        match self.user.lock().unwrap().clone() {
            Some(user) if token == TOKEN => Ok(user),
            _ => Err(ApiError::Unauthorized),
        }
    }

    fn property_from_draft(id: String, draft: &PropertyDraft, owner: &User) -> Property {
        let now = Utc::now();
        Property {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            location: Location {
                address: draft.address.clone(),
                city: draft.city.clone(),
                state: draft.state.clone(),
                latitude: draft.latitude,
                longitude: draft.longitude,
            },
            price: draft.price,
            property_type: draft.property_type,
            listing_type: draft.listing_type,
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            area: draft.area.unwrap_or(0.0),
            plots: draft.plots,
            images: draft.images.clone(),
            gallery: vec![],
            videos: draft.videos.clone(),
            features: draft.features.clone(),
            status: draft.status,
            featured: false,
            likes: 0,
            agent: AgentRef {
                id: format!("agent-{}", owner.id),
                user_id: Some(owner.id.clone()),
                name: Some(owner.name.clone()),
            },
            created_at: now,
            updated_at: now,
        }
    }

    fn find(&self, id: &str) -> ApiResult<Property> {
        self.properties
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut Property)) -> ApiResult<Property> {
        let mut properties = self.properties.lock().unwrap();
        let property = properties
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        f(property);
        Ok(property.clone())
    }
}

pub fn user(id: &str, role: Role) -> User {
    User {
        id: id.to_string(),
        name: format!("User {}", id),
        email: format!("{}@example.com", id),
        role,
        saved_properties: vec![],
        phone: None,
        avatar: None,
        bio: None,
    }
}

pub fn agent(id: &str, user_id: &str) -> Agent {
    Agent {
        id: id.to_string(),
        user_id: Some(user_id.to_string()),
        name: format!("Agent {}", id),
        email: None,
        phone: None,
        agency: Some("Obi Homes".into()),
        rating: Rating { average: 4.0, count: 2 },
        bio: None,
        license: None,
        specialties: vec![],
        avatar: None,
    }
}

#[async_trait]
impl RemoteApi for FakeApi {
    async fn login(&self, email: &str, password: &str) -> ApiResult<AuthSession> {
        self.enter("login").await?;
        match self.user.lock().unwrap().clone() {
            Some(user) if user.email == email && password == "secret" => Ok(AuthSession {
                user,
                token: TOKEN.to_string(),
            }),
            _ => Err(ApiError::Remote {
                status: 400,
                message: Some("Invalid credentials".into()),
            }),
        }
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthSession> {
        self.enter("register").await?;
        let role = if request.as_agent { Role::Agent } else { Role::User };
        let mut user = user("new", role);
        user.name = request.name.clone();
        user.email = request.email.clone();
        *self.user.lock().unwrap() = Some(user.clone());
        Ok(AuthSession {
            user,
            token: TOKEN.to_string(),
        })
    }

    async fn me(&self, token: &str) -> ApiResult<User> {
        self.enter("me").await?;
        self.check_token(token)
    }

    async fn forgot_password(&self, _email: &str) -> ApiResult<()> {
        self.enter("forgot_password").await
    }

    async fn reset_password(&self, _reset_token: &str, _new_password: &str) -> ApiResult<()> {
        self.enter("reset_password").await
    }

    async fn delete_account(&self, token: &str) -> ApiResult<()> {
        self.enter("delete_account").await?;
        self.check_token(token)?;
        *self.user.lock().unwrap() = None;
        Ok(())
    }

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> ApiResult<User> {
        self.enter("update_profile").await?;
        self.check_token(token)?;
        let mut guard = self.user.lock().unwrap();
        let user = guard.as_mut().ok_or(ApiError::Unauthorized)?;
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(phone) = &update.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(bio) = &update.bio {
            user.bio = Some(bio.clone());
        }
        Ok(user.clone())
    }

    async fn save_property(&self, token: &str, property_id: &str) -> ApiResult<()> {
        self.enter("save_property").await?;
        self.check_token(token)?;
        if let Some(user) = self.user.lock().unwrap().as_mut() {
            user.set_saved(property_id, true);
        }
        Ok(())
    }

    async fn unsave_property(&self, token: &str, property_id: &str) -> ApiResult<()> {
        self.enter("unsave_property").await?;
        self.check_token(token)?;
        if let Some(user) = self.user.lock().unwrap().as_mut() {
            user.set_saved(property_id, false);
        }
        Ok(())
    }

    async fn list_properties(&self, query: &PropertyQuery) -> ApiResult<Vec<Property>> {
        self.enter("list_properties").await?;
        let properties = self.properties.lock().unwrap();
        let mut matching: Vec<Property> = properties
            .iter()
            .filter(|p| query.city.as_ref().map_or(true, |c| &p.location.city == c))
            .filter(|p| query.agent.as_ref().map_or(true, |a| &p.agent.id == a))
            .filter(|p| query.featured.map_or(true, |f| p.featured == f))
            .filter(|p| query.max_price.map_or(true, |m| p.price <= m))
            .cloned()
            .collect();
        if let Some(limit) = query.limit {
            matching.truncate(limit as usize);
        }
        Ok(matching)
    }

    async fn get_property(&self, id: &str) -> ApiResult<Property> {
        self.enter("get_property").await?;
        self.find(id)
    }

    async fn create_property(&self, token: &str, draft: &PropertyDraft) -> ApiResult<Property> {
        self.enter("create_property").await?;
        let owner = self.check_token(token)?;
        let mut properties = self.properties.lock().unwrap();
        let property = Self::property_from_draft(format!("p{}", properties.len() + 1), draft, &owner);
        properties.push(property.clone());
        Ok(property)
    }

    async fn update_property(&self, token: &str, id: &str, draft: &PropertyDraft) -> ApiResult<Property> {
        self.enter("update_property").await?;
        let owner = self.check_token(token)?;
        let updated = Self::property_from_draft(id.to_string(), draft, &owner);
        self.modify(id, |p| *p = updated)
    }

    async fn update_status(&self, token: &str, id: &str, status: PropertyStatus) -> ApiResult<Property> {
        self.enter("update_status").await?;
        self.check_token(token)?;
        self.modify(id, |p| p.status = status)
    }

    async fn delete_property(&self, token: &str, id: &str) -> ApiResult<()> {
        self.enter("delete_property").await?;
        self.check_token(token)?;
        let mut properties = self.properties.lock().unwrap();
        let before = properties.len();
        properties.retain(|p| p.id != id);
        if properties.len() == before {
            return Err(ApiError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn admin_list_properties(&self, token: &str) -> ApiResult<Vec<Property>> {
        self.enter("admin_list_properties").await?;
        if !self.check_token(token)?.is_admin() {
            return Err(ApiError::Remote {
                status: 403,
                message: Some("Admins only".into()),
            });
        }
        Ok(self.properties.lock().unwrap().clone())
    }

    async fn toggle_featured(&self, token: &str, id: &str) -> ApiResult<Property> {
        self.enter("toggle_featured").await?;
        self.check_token(token)?;
        self.modify(id, |p| p.featured = !p.featured)
    }

    async fn get_agent(&self, id: &str) -> ApiResult<Agent> {
        self.enter("get_agent").await?;
        self.agents
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    async fn list_agents(&self) -> ApiResult<Vec<Agent>> {
        self.enter("list_agents").await?;
        Ok(self.agents.lock().unwrap().clone())
    }

    async fn rate_agent(&self, token: &str, agent_id: &str, stars: u8) -> ApiResult<Rating> {
        self.enter("rate_agent").await?;
        self.check_token(token)?;
        let mut agents = self.agents.lock().unwrap();
        let agent = agents
            .iter_mut()
            .find(|a| a.id == agent_id)
            .ok_or_else(|| ApiError::NotFound(agent_id.to_string()))?;
        let total = agent.rating.average * agent.rating.count as f32 + stars as f32;
        agent.rating.count += 1;
        agent.rating.average = total / agent.rating.count as f32;
        Ok(agent.rating)
    }
}
