pub mod filter;
pub mod suggest;

pub use filter::{filter_properties, SearchFilter, DEFAULT_MAX_PRICE};
pub use suggest::{suggestions, SuggestionBox, MAX_SEGMENT_LEN, MAX_SUGGESTIONS};
