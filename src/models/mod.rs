use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod agent;
pub mod media;
pub mod user;

pub use agent::{Agent, Rating};
pub use media::MediaItem;
pub use user::{Role, User};

/// Kind of building or land a listing describes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PropertyType {
    House,
    Apartment,
    Condo,
    Land,
    Villa,
    Commercial,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::House => "House",
            PropertyType::Apartment => "Apartment",
            PropertyType::Condo => "Condo",
            PropertyType::Land => "Land",
            PropertyType::Villa => "Villa",
            PropertyType::Commercial => "Commercial",
        }
    }
}

/// How a listing is offered
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ListingType {
    Sale,
    Rent,
    Land,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Sale => "Sale",
            ListingType::Rent => "Rent",
            ListingType::Land => "Land",
        }
    }
}

/// Availability of a listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum PropertyStatus {
    #[default]
    Available,
    Pending,
    Sold,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Available => "Available",
            PropertyStatus::Pending => "Pending",
            PropertyStatus::Sold => "Sold",
        }
    }

    /// Next status in the owner's toggle cycle
    pub fn next(&self) -> Self {
        match self {
            PropertyStatus::Available => PropertyStatus::Pending,
            PropertyStatus::Pending => PropertyStatus::Sold,
            PropertyStatus::Sold => PropertyStatus::Available,
        }
    }
}

/// Returned when a category name does not match any known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! str_enum {
    ($ty:ident, $kind:literal, [$($variant:ident),+]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case(stringify!($variant)) {
                        return Ok($ty::$variant);
                    }
                )+
                Err(UnknownVariant { kind: $kind, value: s.to_string() })
            }
        }
    };
}

str_enum!(PropertyType, "property type", [House, Apartment, Condo, Land, Villa, Commercial]);
str_enum!(ListingType, "listing type", [Sale, Rent, Land]);
str_enum!(PropertyStatus, "status", [Available, Pending, Sold]);

/// Location information for a property
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Location {
    pub address: String,
    pub city: String,
    pub state: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// The agent that owns a listing, as embedded in the listing itself
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRef {
    pub id: String,
    /// Account id of the agent, used for ownership checks
    pub user_id: Option<String>,
    pub name: Option<String>,
}

/// Core property data model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: Location,
    pub price: i64,
    pub property_type: PropertyType,
    pub listing_type: ListingType,
    pub bedrooms: u32,
    pub bathrooms: u32,
    /// Square meters
    pub area: f64,
    pub plots: Option<u32>,
    pub images: Vec<String>,
    pub gallery: Vec<String>,
    pub videos: Vec<String>,
    pub features: Vec<String>,
    pub status: PropertyStatus,
    pub featured: bool,
    pub likes: u32,
    pub agent: AgentRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Whether the given account owns this listing
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.agent.user_id.as_deref() == Some(user_id)
    }

    /// First image, if any, for list rendering
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}
