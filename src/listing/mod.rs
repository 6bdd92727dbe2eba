pub mod form;
pub mod geo;
pub mod workflow;

pub use form::{Field, ListingForm, MediaError, ValidationErrors, MAX_IMAGES, MAX_IMAGE_BYTES, MAX_VIDEO_BYTES};
pub use geo::{FixedLocation, GeoError, GeoPoint, LocationProvider, NoLocation};
pub use workflow::{EditTarget, ListingWorkflow, PublishError, PublishState};
