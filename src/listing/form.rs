use crate::api::PropertyDraft;
use crate::models::{ListingType, MediaItem, Property, PropertyStatus, PropertyType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Each image must be smaller than this
pub const MAX_IMAGE_BYTES: u64 = 500 * 1024;
/// Each video must be smaller than this
pub const MAX_VIDEO_BYTES: u64 = 2 * 1024 * 1024;
pub const MAX_IMAGES: usize = 4;

/// Form fields that can carry an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Price,
    Address,
    City,
    State,
    Area,
    Plots,
    Images,
    Videos,
}

impl Field {
    pub fn key(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Price => "price",
            Field::Address => "address",
            Field::City => "city",
            Field::State => "state",
            Field::Area => "area",
            Field::Plots => "plots",
            Field::Images => "images",
            Field::Videos => "videos",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Inline errors keyed by field
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{}", summary(.0))]
pub struct ValidationErrors(BTreeMap<Field, String>);

fn summary(errors: &BTreeMap<Field, String>) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn remove(&mut self, field: Field) {
        self.0.remove(&field);
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Rejected media file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("{name} is {size} bytes; images must be under 500KB")]
    ImageTooLarge { name: String, size: u64 },

    #[error("At most 4 images are allowed")]
    TooManyImages,

    #[error("{name} is {size} bytes; videos must be under 2MB")]
    VideoTooLarge { name: String, size: u64 },
}

impl MediaError {
    pub fn field(&self) -> Field {
        match self {
            MediaError::ImageTooLarge { .. } | MediaError::TooManyImages => Field::Images,
            MediaError::VideoTooLarge { .. } => Field::Videos,
        }
    }
}

fn media_name(item: &MediaItem) -> String {
    match item {
        MediaItem::Local { file_name, .. } => file_name.clone(),
        MediaItem::Remote { url } => url.clone(),
    }
}

/// Raw listing form input
///
/// Numeric fields stay as text until validation so an empty box can be told
/// apart from zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingForm {
    pub title: String,
    pub description: String,
    pub price: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub property_type: PropertyType,
    pub listing_type: ListingType,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area: String,
    pub plots: String,
    pub features: Vec<String>,
    pub status: PropertyStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    images: Vec<MediaItem>,
    videos: Vec<MediaItem>,
}

impl Default for ListingForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            price: String::new(),
            address: String::new(),
            city: String::new(),
            state: String::new(),
            property_type: PropertyType::House,
            listing_type: ListingType::Sale,
            bedrooms: 0,
            bathrooms: 0,
            area: String::new(),
            plots: String::new(),
            features: Vec::new(),
            status: PropertyStatus::Available,
            latitude: None,
            longitude: None,
            images: Vec::new(),
            videos: Vec::new(),
        }
    }
}

impl ListingForm {
    /// Prefill from an existing listing for editing
    pub fn from_property(property: &Property) -> Self {
        Self {
            title: property.title.clone(),
            description: property.description.clone(),
            price: property.price.to_string(),
            address: property.location.address.clone(),
            city: property.location.city.clone(),
            state: property.location.state.clone(),
            property_type: property.property_type,
            listing_type: property.listing_type,
            bedrooms: property.bedrooms,
            bathrooms: property.bathrooms,
            area: if property.area > 0.0 {
                property.area.to_string()
            } else {
                String::new()
            },
            plots: property.plots.map(|p| p.to_string()).unwrap_or_default(),
            features: property.features.clone(),
            status: property.status,
            latitude: property.location.latitude,
            longitude: property.location.longitude,
            images: property.images.iter().map(MediaItem::remote).collect(),
            videos: property.videos.iter().map(MediaItem::remote).collect(),
        }
    }

    pub fn images(&self) -> &[MediaItem] {
        &self.images
    }

    pub fn videos(&self) -> &[MediaItem] {
        &self.videos
    }

    pub(crate) fn media_mut(&mut self) -> (&mut Vec<MediaItem>, &mut Vec<MediaItem>) {
        (&mut self.images, &mut self.videos)
    }

    pub fn add_image(&mut self, item: MediaItem) -> Result<(), MediaError> {
        if self.images.len() >= MAX_IMAGES {
            return Err(MediaError::TooManyImages);
        }
        if let Some(size) = item.size().filter(|s| *s >= MAX_IMAGE_BYTES) {
            return Err(MediaError::ImageTooLarge {
                name: media_name(&item),
                size,
            });
        }
        self.images.push(item);
        Ok(())
    }

    pub fn add_video(&mut self, item: MediaItem) -> Result<(), MediaError> {
        if let Some(size) = item.size().filter(|s| *s >= MAX_VIDEO_BYTES) {
            return Err(MediaError::VideoTooLarge {
                name: media_name(&item),
                size,
            });
        }
        self.videos.push(item);
        Ok(())
    }

    pub fn remove_image(&mut self, index: usize) -> Option<MediaItem> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    pub fn remove_video(&mut self, index: usize) -> Option<MediaItem> {
        (index < self.videos.len()).then(|| self.videos.remove(index))
    }

    /// Fields that must be filled for the current listing type
    pub fn required_fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::Title, Field::Price, Field::Address, Field::City, Field::State];
        if self.listing_type == ListingType::Land {
            fields.extend([Field::Area, Field::Plots]);
        }
        fields.extend([Field::Images, Field::Videos]);
        fields
    }

    fn is_blank(&self, field: Field) -> bool {
        match field {
            Field::Title => self.title.trim().is_empty(),
            Field::Price => self.price.trim().is_empty(),
            Field::Address => self.address.trim().is_empty(),
            Field::City => self.city.trim().is_empty(),
            Field::State => self.state.trim().is_empty(),
            Field::Area => self.area.trim().is_empty(),
            Field::Plots => self.plots.trim().is_empty(),
            Field::Images => self.images.is_empty(),
            Field::Videos => self.videos.is_empty(),
        }
    }

    /// Check required fields, then number formats and media limits
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        self.to_draft().map(|_| ())
    }

    /// Validate and build the payload sent to the backend
    ///
    /// Pending media is sent as its data URI.
    pub fn to_draft(&self) -> Result<PropertyDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        for field in self.required_fields() {
            if self.is_blank(field) {
                let message = match field {
                    Field::Images => "Add at least one image".to_string(),
                    Field::Videos => "Add at least one video".to_string(),
                    other => format!("{} is required", capitalize(other.key())),
                };
                errors.insert(field, message);
            }
        }

        let price = parse_field::<i64>(&self.price, Field::Price, &mut errors).filter(|p| {
            if *p <= 0 {
                errors.insert(Field::Price, "Price must be greater than zero");
                false
            } else {
                true
            }
        });
        let area = parse_field::<f64>(&self.area, Field::Area, &mut errors);
        let plots = parse_field::<u32>(&self.plots, Field::Plots, &mut errors);

        if self.images.len() > MAX_IMAGES {
            errors.insert(Field::Images, format!("At most {} images are allowed", MAX_IMAGES));
        }
        if let Some(err) = self
            .images
            .iter()
            .find(|i| i.size().is_some_and(|s| s >= MAX_IMAGE_BYTES))
            .map(|i| MediaError::ImageTooLarge {
                name: media_name(i),
                size: i.size().unwrap_or_default(),
            })
        {
            errors.insert(Field::Images, err.to_string());
        }
        if let Some(err) = self
            .videos
            .iter()
            .find(|v| v.size().is_some_and(|s| s >= MAX_VIDEO_BYTES))
            .map(|v| MediaError::VideoTooLarge {
                name: media_name(v),
                size: v.size().unwrap_or_default(),
            })
        {
            errors.insert(Field::Videos, err.to_string());
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(PropertyDraft {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            price: price.unwrap_or_default(),
            property_type: self.property_type,
            listing_type: self.listing_type,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            area,
            plots,
            images: self.images.iter().map(|m| m.url().to_string()).collect(),
            videos: self.videos.iter().map(|m| m.url().to_string()).collect(),
            features: self
                .features
                .iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect(),
            status: self.status,
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

/// Parse a non-empty numeric field, recording a format error if it fails
fn parse_field<T: std::str::FromStr>(raw: &str, field: Field, errors: &mut ValidationErrors) -> Option<T> {
    let raw = raw.trim().replace(',', "");
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.insert(field, format!("{} must be a number", capitalize(field.key())));
            None
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A form that passes validation
#[cfg(test)]
pub(crate) fn sample_form() -> ListingForm {
    let mut form = ListingForm {
        title: "Lekki Villa".into(),
        price: "15,000,000".into(),
        address: "No 2, Omojuwa Avenue".into(),
        city: "Lekki".into(),
        state: "Lagos".into(),
        ..Default::default()
    };
    form.images.push(MediaItem::local("front.jpg", "image/jpeg", &[0u8; 1024]));
    form.videos.push(MediaItem::local("tour.mp4", "video/mp4", &[0u8; 2048]));
    form
}
