//! Backend wire shapes and their translation into internal models
//!
//! This is the only place that knows about the backend's field names:
//! nested `address` objects, `propertyType`, `area.value`, `_id`, and an
//! `agent` that may be a bare id or a populated document.

use crate::api::types::{AuthSession, PropertyDraft};
use crate::error::ApiError;
use crate::models::{
    Agent, AgentRef, ListingType, Location, Property, PropertyStatus, PropertyType, Rating, Role,
    User,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

/// Either a bare id or a populated document with an id
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdOrDoc<T> {
    Id(String),
    Doc(T),
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdOnly {
    #[serde(alias = "_id")]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AddressDto {
    Flat(String),
    Nested {
        #[serde(default, alias = "address")]
        street: String,
        #[serde(default)]
        city: String,
        #[serde(default)]
        state: String,
        #[serde(default)]
        coordinates: Option<CoordinatesDto>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatesDto {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude", alias = "lon")]
    pub lng: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AreaDto {
    Plain(f64),
    Measured { value: f64 },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAgentDto {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub user: Option<IdOrDoc<IdOnly>>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDto {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub address: Option<AddressDto>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default, alias = "type")]
    pub property_type: Option<String>,
    #[serde(default)]
    pub listing_type: Option<String>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub area: Option<AreaDto>,
    #[serde(default)]
    pub plots: Option<u32>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "featured")]
    pub is_featured: bool,
    #[serde(default)]
    pub likes: u32,
    pub agent: Option<IdOrDoc<PropertyAgentDto>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<PropertyDto> for Property {
    type Error = ApiError;

    fn try_from(dto: PropertyDto) -> Result<Self, Self::Error> {
        let agent = match dto.agent {
            Some(IdOrDoc::Id(id)) => AgentRef {
                id,
                user_id: None,
                name: None,
            },
            Some(IdOrDoc::Doc(a)) => AgentRef {
                id: a.id,
                user_id: a.user.map(|u| match u {
                    IdOrDoc::Id(id) => id,
                    IdOrDoc::Doc(doc) => doc.id,
                }),
                name: a.name,
            },
            None => {
                return Err(ApiError::Decode(format!(
                    "property {} has no owning agent",
                    dto.id
                )))
            }
        };

        let mut location = match dto.address {
            Some(AddressDto::Flat(address)) => Location {
                address,
                ..Default::default()
            },
            Some(AddressDto::Nested {
                street,
                city,
                state,
                coordinates,
            }) => Location {
                address: street,
                city,
                state,
                latitude: coordinates.as_ref().map(|c| c.lat),
                longitude: coordinates.as_ref().map(|c| c.lng),
            },
            None => Location::default(),
        };
        if let Some(city) = dto.city.filter(|c| !c.is_empty()) {
            location.city = city;
        }
        if let Some(state) = dto.state.filter(|s| !s.is_empty()) {
            location.state = state;
        }

        let property_type = match dto.property_type.as_deref() {
            Some(t) => t.parse().unwrap_or_else(|e| {
                warn!("Property {}: {}, treating as House", dto.id, e);
                PropertyType::House
            }),
            None => PropertyType::House,
        };

        let listing_type = match dto.listing_type.as_deref().map(str::parse::<ListingType>) {
            Some(Ok(t)) => t,
            _ if property_type == PropertyType::Land => ListingType::Land,
            _ => ListingType::Sale,
        };

        let status = dto
            .status
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let now = Utc::now();
        let created_at = dto.created_at.unwrap_or(now);

        Ok(Property {
            id: dto.id,
            title: dto.title,
            description: dto.description,
            location,
            price: dto.price.round() as i64,
            property_type,
            listing_type,
            bedrooms: dto.bedrooms.unwrap_or(0),
            bathrooms: dto.bathrooms.unwrap_or(0),
            area: match dto.area {
                Some(AreaDto::Plain(v)) | Some(AreaDto::Measured { value: v }) => v,
                None => 0.0,
            },
            plots: dto.plots,
            images: dto.images,
            gallery: dto.gallery,
            videos: dto.videos,
            features: dto.features,
            status,
            featured: dto.is_featured,
            likes: dto.likes,
            agent,
            created_at,
            updated_at: dto.updated_at.unwrap_or(created_at),
        })
    }
}

/// Body sent to create or update a listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPayloadDto {
    pub title: String,
    pub description: String,
    pub address: serde_json::Value,
    pub price: i64,
    pub property_type: String,
    pub listing_type: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plots: Option<u32>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub features: Vec<String>,
    pub status: String,
}

impl From<&PropertyDraft> for PropertyPayloadDto {
    fn from(draft: &PropertyDraft) -> Self {
        let mut address = json!({
            "street": draft.address,
            "city": draft.city,
            "state": draft.state,
        });
        if let (Some(lat), Some(lng)) = (draft.latitude, draft.longitude) {
            address["coordinates"] = json!({ "lat": lat, "lng": lng });
        }

        Self {
            title: draft.title.clone(),
            description: draft.description.clone(),
            address,
            price: draft.price,
            property_type: draft.property_type.to_string(),
            listing_type: draft.listing_type.to_string(),
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            area: draft.area.map(|v| json!({ "value": v, "unit": "sqm" })),
            plots: draft.plots,
            images: draft.images.clone(),
            videos: draft.videos.clone(),
            features: draft.features.clone(),
            status: draft.status.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RatingDto {
    Plain(f32),
    Summary {
        #[serde(alias = "avg", alias = "value")]
        average: f32,
        #[serde(default)]
        count: u32,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDto {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub user: Option<IdOrDoc<AgentUserDto>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "agency")]
    pub agency_name: Option<String>,
    #[serde(default)]
    pub rating: Option<RatingDto>,
    #[serde(default, alias = "ratingCount", alias = "numRatings")]
    pub total_ratings: Option<u32>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default, alias = "license")]
    pub license_number: Option<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default, alias = "profileImage")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentUserDto {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl From<AgentDto> for Agent {
    fn from(dto: AgentDto) -> Self {
        let (user_id, user) = match dto.user {
            Some(IdOrDoc::Id(id)) => (Some(id), None),
            Some(IdOrDoc::Doc(u)) => (Some(u.id.clone()), Some(u)),
            None => (None, None),
        };

        let rating = match dto.rating {
            Some(RatingDto::Plain(average)) => Rating {
                average,
                count: dto.total_ratings.unwrap_or(0),
            },
            Some(RatingDto::Summary { average, count }) => Rating {
                average,
                count: dto.total_ratings.unwrap_or(count),
            },
            None => Rating::default(),
        };

        // Contact details may live on the populated account instead
        let name = dto
            .name
            .or_else(|| user.as_ref().and_then(|u| u.name.clone()))
            .unwrap_or_default();
        let email = dto.email.or_else(|| user.as_ref().and_then(|u| u.email.clone()));
        let phone = dto.phone.or_else(|| user.as_ref().and_then(|u| u.phone.clone()));
        let avatar = dto.avatar.or_else(|| user.as_ref().and_then(|u| u.avatar.clone()));

        Agent {
            id: dto.id,
            user_id,
            name,
            email,
            phone,
            agency: dto.agency_name,
            rating,
            bio: dto.bio,
            license: dto.license_number,
            specialties: dto.specialties,
            avatar,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "likedProperties")]
    pub saved_properties: Vec<IdOrDoc<IdOnly>>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl From<UserDto> for User {
    fn from(dto: UserDto) -> Self {
        let role = match dto.role.as_deref() {
            Some("agent") => Role::Agent,
            Some("admin") => Role::Admin,
            _ => Role::User,
        };

        let mut user = User {
            id: dto.id,
            name: dto.name,
            email: dto.email,
            role,
            saved_properties: Vec::new(),
            phone: dto.phone,
            avatar: dto.avatar,
            bio: dto.bio,
        };
        for saved in dto.saved_properties {
            let id = match saved {
                IdOrDoc::Id(id) => id,
                IdOrDoc::Doc(doc) => doc.id,
            };
            user.set_saved(&id, true);
        }
        user
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponseDto {
    pub token: String,
    pub user: UserDto,
}

impl From<AuthResponseDto> for AuthSession {
    fn from(dto: AuthResponseDto) -> Self {
        AuthSession {
            user: dto.user.into(),
            token: dto.token,
        }
    }
}

/// `/auth/me` and profile responses, bare or as `{ user: ... }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserEnvelope {
    Wrapped { user: UserDto },
    Bare(UserDto),
}

impl From<UserEnvelope> for User {
    fn from(envelope: UserEnvelope) -> Self {
        match envelope {
            UserEnvelope::Wrapped { user } | UserEnvelope::Bare(user) => user.into(),
        }
    }
}

/// Agent responses, bare or as `{ agent: ... }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AgentEnvelope {
    Wrapped { agent: AgentDto },
    Bare(AgentDto),
}

impl From<AgentEnvelope> for Agent {
    fn from(envelope: AgentEnvelope) -> Self {
        match envelope {
            AgentEnvelope::Wrapped { agent } | AgentEnvelope::Bare(agent) => agent.into(),
        }
    }
}

/// Result of rating an agent: the recomputed aggregate
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateResponseDto {
    #[serde(alias = "averageRating")]
    pub rating: f32,
    #[serde(default, alias = "ratingCount", alias = "numRatings")]
    pub total_ratings: u32,
}

impl From<RateResponseDto> for Rating {
    fn from(dto: RateResponseDto) -> Self {
        Rating {
            average: dto.rating,
            count: dto.total_ratings,
        }
    }
}

/// A list that may arrive bare or inside a `{ data: [...] }` envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Wrapped {
        #[serde(alias = "data", alias = "properties", alias = "agents")]
        items: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Wrapped { items } => items,
            ListEnvelope::Bare(items) => items,
        }
    }
}

/// A single document that may arrive bare or inside an envelope
///
/// Not used for agents or users: a bare agent carries a `user` field that
/// would be mistaken for an envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ItemEnvelope<T> {
    Wrapped {
        #[serde(alias = "data", alias = "property")]
        item: T,
    },
    Bare(T),
}

impl<T> ItemEnvelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            ItemEnvelope::Wrapped { item } => item,
            ItemEnvelope::Bare(item) => item,
        }
    }
}

/// Convert a list of property documents, skipping ones that fail to adapt
/// Decode list items one at a time, skipping the ones that do not fit
///
/// A single malformed document must not take the whole list down with it.
pub fn decode_items<T: DeserializeOwned>(kind: &str, items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item) {
            Ok(dto) => Some(dto),
            Err(e) => {
                warn!("Skipping {} #{}: {}", kind, i, e);
                None
            }
        })
        .collect()
}

pub fn properties_from_json(items: Vec<Value>) -> Vec<Property> {
    decode_items::<PropertyDto>("property", items)
        .into_iter()
        .filter_map(|dto| match Property::try_from(dto) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Skipping property: {}", e);
                None
            }
        })
        .collect()
}
