//! Page-level data loading
//!
//! Independent fetches for a page run concurrently. Each section fails on
//! its own: a broken section is left empty with an error message and the
//! rest of the page still renders.

use crate::api::{PropertyQuery, RemoteApi};
use crate::error::{ApiError, ApiResult};
use crate::models::{Agent, Property};
use crate::session::SessionStore;
use tracing::{debug, warn};

pub const FEATURED_LIMIT: u32 = 6;
pub const LATEST_LIMIT: u32 = 8;
pub const TOP_AGENTS: usize = 4;
pub const SUGGESTED_LIMIT: usize = 4;

/// One independently loaded part of a page
#[derive(Debug, Clone, PartialEq)]
pub struct Section<T> {
    pub items: Vec<T>,
    pub error: Option<String>,
}

impl<T> Section<T> {
    fn from_result(name: &str, result: ApiResult<Vec<T>>) -> Self {
        match result {
            Ok(items) => {
                debug!("Loaded {} item(s) for {}", items.len(), name);
                Self { items, error: None }
            }
            Err(e) => {
                warn!("Section {} failed: {}", name, e);
                Self {
                    items: Vec::new(),
                    error: Some(e.user_message()),
                }
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct HomePage {
    pub featured: Section<Property>,
    pub latest: Section<Property>,
    pub agents: Section<Agent>,
}

pub async fn load_home(api: &dyn RemoteApi) -> HomePage {
    let featured_query = PropertyQuery {
        featured: Some(true),
        limit: Some(FEATURED_LIMIT),
        ..Default::default()
    };
    let latest_query = PropertyQuery {
        limit: Some(LATEST_LIMIT),
        ..Default::default()
    };

    let (featured, latest, agents) = tokio::join!(
        api.list_properties(&featured_query),
        api.list_properties(&latest_query),
        api.list_agents(),
    );

    let agents = agents.map(|mut agents| {
        agents.sort_by(|a, b| b.rating.average.total_cmp(&a.rating.average));
        agents.truncate(TOP_AGENTS);
        agents
    });

    HomePage {
        featured: Section::from_result("featured", featured),
        latest: Section::from_result("latest", latest),
        agents: Section::from_result("agents", agents),
    }
}

#[derive(Debug, Clone)]
pub struct PropertyPage {
    pub property: Property,
    pub agent: Option<Agent>,
    pub agent_error: Option<String>,
    /// Other listings in the same city
    pub suggested: Section<Property>,
    pub is_owner: bool,
    pub is_saved: bool,
}

/// The listing itself must load; its agent and suggestions may not
pub async fn load_property(session: &SessionStore, id: &str) -> ApiResult<PropertyPage> {
    let api = session.api();
    let property = api.get_property(id).await?;

    let suggested_query = PropertyQuery {
        city: Some(property.location.city.clone()).filter(|c| !c.is_empty()),
        limit: Some(SUGGESTED_LIMIT as u32 + 1),
        ..Default::default()
    };
    let (agent, suggested) = tokio::join!(
        api.get_agent(&property.agent.id),
        api.list_properties(&suggested_query),
    );

    let suggested = suggested.map(|list| {
        list.into_iter()
            .filter(|p| p.id != property.id)
            .take(SUGGESTED_LIMIT)
            .collect()
    });

    let (agent, agent_error) = match agent {
        Ok(agent) => (Some(agent), None),
        Err(e) => {
            warn!("Agent {} failed to load: {}", property.agent.id, e);
            (None, Some(e.user_message()))
        }
    };

    let owner_id = property
        .agent
        .user_id
        .clone()
        .or_else(|| agent.as_ref().and_then(|a| a.user_id.clone()));
    let is_owner = session.is_owner(owner_id.as_deref());
    let is_saved = session.current_user().is_some_and(|u| u.has_saved(&property.id));

    Ok(PropertyPage {
        suggested: Section::from_result("suggested", suggested),
        property,
        agent,
        agent_error,
        is_owner,
        is_saved,
    })
}

#[derive(Debug, Clone)]
pub struct AgentPage {
    pub agent: Agent,
    pub listings: Section<Property>,
    pub is_owner: bool,
}

pub async fn load_agent(session: &SessionStore, id: &str) -> ApiResult<AgentPage> {
    let api = session.api();
    let listings_query = PropertyQuery {
        agent: Some(id.to_string()),
        ..Default::default()
    };
    let (agent, listings) = tokio::join!(api.get_agent(id), api.list_properties(&listings_query));
    let agent = agent?;

    Ok(AgentPage {
        is_owner: session.is_owner(agent.user_id.as_deref()),
        agent,
        listings: Section::from_result("listings", listings),
    })
}

/// Listings of the signed-in agent, or every listing for an admin
pub async fn load_dashboard(session: &SessionStore) -> ApiResult<Vec<Property>> {
    let user = session.current_user().ok_or(ApiError::Unauthorized)?;
    let token = session.token().ok_or(ApiError::Unauthorized)?;
    let api = session.api();

    if user.is_admin() {
        return api.admin_list_properties(token).await;
    }
    let all = api.list_properties(&PropertyQuery::default()).await?;
    Ok(all.into_iter().filter(|p| p.is_owned_by(&user.id)).collect())
}

/// Properties the signed-in user has liked, in the order they were saved
pub async fn load_saved(session: &SessionStore) -> ApiResult<Vec<Property>> {
    let user = session.current_user().ok_or(ApiError::Unauthorized)?;
    let all = session.api().list_properties(&PropertyQuery::default()).await?;
    Ok(user
        .saved_properties
        .iter()
        .filter_map(|id| all.iter().find(|p| &p.id == id).cloned())
        .collect())
}
