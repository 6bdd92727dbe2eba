use crate::models::{ListingType, PropertyStatus, PropertyType, User};
use serde::{Deserialize, Serialize};

/// Query parameters for the remote property list endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PropertyQuery {
    /// Free-text search
    pub search: Option<String>,
    pub property_type: Option<PropertyType>,
    pub listing_type: Option<ListingType>,
    pub city: Option<String>,
    /// Minimum price
    pub min_price: Option<i64>,
    /// Maximum price
    pub max_price: Option<i64>,
    /// Only listings owned by this agent
    pub agent: Option<String>,
    pub featured: Option<bool>,
    pub limit: Option<u32>,
}

impl PropertyQuery {
    /// Flatten into `?key=value` pairs, skipping unset fields
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = self.search.as_ref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search", search.trim().to_string()));
        }
        if let Some(t) = self.property_type {
            pairs.push(("propertyType", t.to_string()));
        }
        if let Some(t) = self.listing_type {
            pairs.push(("listingType", t.to_string()));
        }
        if let Some(city) = &self.city {
            pairs.push(("city", city.clone()));
        }
        if let Some(p) = self.min_price {
            pairs.push(("minPrice", p.to_string()));
        }
        if let Some(p) = self.max_price {
            pairs.push(("maxPrice", p.to_string()));
        }
        if let Some(agent) = &self.agent {
            pairs.push(("agent", agent.clone()));
        }
        if let Some(featured) = self.featured {
            pairs.push(("featured", featured.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Listing fields sent on create and update
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyDraft {
    pub title: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub price: i64,
    pub property_type: PropertyType,
    pub listing_type: ListingType,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area: Option<f64>,
    pub plots: Option<u32>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub features: Vec<String>,
    pub status: PropertyStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Register straight into an agent profile
    #[serde(default)]
    pub as_agent: bool,
    pub phone: Option<String>,
}

/// Fields a user may change on their own profile
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

/// User and bearer token returned by login and register
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}
