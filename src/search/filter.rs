use crate::api::PropertyQuery;
use crate::models::{ListingType, Property, PropertyType};
use serde::{Deserialize, Serialize};

/// Ceiling used when the user has not picked a maximum price
pub const DEFAULT_MAX_PRICE: i64 = 1_000_000_000;

/// Criteria for narrowing an already-loaded list of properties
///
/// `None` for a category means "All".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchFilter {
    pub term: String,
    pub property_type: Option<PropertyType>,
    pub listing_type: Option<ListingType>,
    /// Inclusive upper bound on price
    pub max_price: i64,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            term: String::new(),
            property_type: None,
            listing_type: None,
            max_price: DEFAULT_MAX_PRICE,
        }
    }
}

impl SearchFilter {
    pub fn with_term(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn matches(&self, property: &Property) -> bool {
        self.matches_term(property)
            && self.matches_type(property)
            && self.matches_listing(property)
            && property.price <= self.max_price
    }

    fn matches_term(&self, property: &Property) -> bool {
        let term = self.term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }

        [
            property.title.as_str(),
            property.location.city.as_str(),
            property.location.address.as_str(),
            property.location.state.as_str(),
            property.description.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&term))
    }

    fn matches_type(&self, property: &Property) -> bool {
        self.property_type.map_or(true, |t| property.property_type == t)
    }

    fn matches_listing(&self, property: &Property) -> bool {
        match self.listing_type {
            None => true,
            // Land plots are often listed "for sale" but still belong under Land
            Some(ListingType::Land) => {
                property.listing_type == ListingType::Land || property.property_type == PropertyType::Land
            }
            Some(t) => property.listing_type == t,
        }
    }

    /// The same criteria as remote query parameters
    pub fn to_query(&self) -> PropertyQuery {
        PropertyQuery {
            search: Some(self.term.trim().to_string()).filter(|t| !t.is_empty()),
            property_type: self.property_type,
            listing_type: self.listing_type,
            max_price: (self.max_price < DEFAULT_MAX_PRICE).then_some(self.max_price),
            ..Default::default()
        }
    }
}

/// Matching subset of `properties`, in their original order
pub fn filter_properties<'a>(properties: &'a [Property], filter: &SearchFilter) -> Vec<&'a Property> {
    properties.iter().filter(|p| filter.matches(p)).collect()
}
