use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("Location permission denied")]
    Denied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),

    #[error("Coordinates out of range: {0}, {1}")]
    OutOfRange(f64, f64),
}

/// Source of the device's current position
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<GeoPoint, GeoError>;
}

/// A position known up front, e.g. passed on the command line
pub struct FixedLocation(pub GeoPoint);

impl FixedLocation {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::OutOfRange(latitude, longitude));
        }
        Ok(Self(GeoPoint { latitude, longitude }))
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<GeoPoint, GeoError> {
        Ok(self.0)
    }
}

/// Used when no position source is available at all
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_position(&self) -> Result<GeoPoint, GeoError> {
        Err(GeoError::Unavailable("no location source configured".into()))
    }
}
