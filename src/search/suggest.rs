use crate::models::Property;
use std::collections::HashSet;

pub const MAX_SUGGESTIONS: usize = 5;

/// Address segments at or above this many characters are never offered
pub const MAX_SEGMENT_LEN: usize = 50;

/// Location names from `properties` that contain `query`
///
/// City, state, then comma-separated address segments are collected in
/// property order, deduplicated, and capped at [`MAX_SUGGESTIONS`]. Queries
/// of one character or less yield nothing.
pub fn suggestions(properties: &[Property], query: &str) -> Vec<String> {
    let needle = query.trim().to_lowercase();
    if needle.chars().count() <= 1 {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut push = |candidate: &str| {
        if out.len() < MAX_SUGGESTIONS && seen.insert(candidate.to_string()) {
            out.push(candidate.to_string());
        }
    };

    for property in properties {
        let city = property.location.city.trim();
        let state = property.location.state.trim();
        let city_lower = city.to_lowercase();
        let state_lower = state.to_lowercase();

        if city_lower.contains(&needle) {
            push(city);
        }
        if state_lower.contains(&needle) {
            push(state);
        }

        for segment in property.location.address.split(',').map(str::trim) {
            let lower = segment.to_lowercase();
            if segment.is_empty()
                || lower == city_lower
                || lower == state_lower
                || segment.chars().count() >= MAX_SEGMENT_LEN
            {
                continue;
            }
            if lower.contains(&needle) {
                push(segment);
            }
        }
    }

    out
}

/// Type-ahead state for a search box
///
/// Every keystroke recomputes from the loaded list; there is no debounce.
#[derive(Debug, Clone, Default)]
pub struct SuggestionBox {
    query: String,
    items: Vec<String>,
}

impl SuggestionBox {
    pub fn on_input(&mut self, input: &str, properties: &[Property]) -> &[String] {
        self.query = input.to_string();
        self.items = suggestions(properties, input);
        &self.items
    }

    /// Accept a suggestion as the new query
    pub fn pick(&mut self, index: usize) -> Option<String> {
        let picked = self.items.get(index).cloned()?;
        self.query = picked.clone();
        self.items.clear();
        Some(picked)
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.items.clear();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::property;
    use proptest::prelude::*;

    fn at(address: &str, city: &str, state: &str) -> Property {
        let mut p = property("x", "Home", city, 1);
        p.location.address = address.to_string();
        p.location.state = state.to_string();
        p
    }

    #[test]
    fn test_address_segment_suggested() {
        let props = vec![at("No 2, Omojuwa Avenue, Kajola", "Kajola", "Ogun")];
        assert_eq!(suggestions(&props, "omo"), vec!["Omojuwa Avenue".to_string()]);
    }

    #[test]
    fn test_city_not_repeated_from_address() {
        let props = vec![at("No 2, Omojuwa Avenue, Kajola", "Kajola", "Ogun")];
        assert_eq!(suggestions(&props, "kaj"), vec!["Kajola".to_string()]);
    }

    #[test]
    fn test_city_not_repeated_with_non_ascii_case() {
        let props = vec![at("12 Allen Avenue, ÌKEJA", "Ìkeja", "Lagos")];
        assert_eq!(suggestions(&props, "keja"), vec!["Ìkeja".to_string()]);
    }

    #[test]
    fn test_short_query_clears() {
        let props = vec![at("Lekki Phase 1", "Lekki", "Lagos")];
        assert!(suggestions(&props, "l").is_empty());
        assert!(suggestions(&props, " ").is_empty());
        assert!(!suggestions(&props, "le").is_empty());
    }

    #[test]
    fn test_long_segments_skipped() {
        let long = "a".repeat(49) + "z";
        let props = vec![at(&format!("{}, Zeta Close", long), "Ikeja", "Lagos")];
        assert_eq!(suggestions(&props, "ze"), vec!["Zeta Close".to_string()]);
    }

    #[test]
    fn test_capped_and_in_insertion_order() {
        let props: Vec<_> = (0..8)
            .map(|i| at(&format!("{} Palm Street", i), &format!("Palmgrove {}", i), "Lagos"))
            .collect();
        let got = suggestions(&props, "palm");
        assert_eq!(got.len(), MAX_SUGGESTIONS);
        assert_eq!(got[0], "Palmgrove 0");
        assert_eq!(got[1], "0 Palm Street");
    }

    #[test]
    fn test_suggestion_box_pick() {
        let props = vec![at("Admiralty Way", "Lekki", "Lagos")];
        let mut sbox = SuggestionBox::default();
        assert_eq!(sbox.on_input("adm", &props).len(), 1);
        assert_eq!(sbox.pick(0).as_deref(), Some("Admiralty Way"));
        assert_eq!(sbox.query(), "Admiralty Way");
        assert!(sbox.items().is_empty());
        assert!(sbox.on_input("a", &props).is_empty());
    }

    proptest! {
        #[test]
        fn prop_suggestions_bounded_unique_and_matching(
            addresses in proptest::collection::vec("[A-Za-z ,]{0,40}", 0..20),
            query in "[A-Za-z]{2,4}",
        ) {
            let props: Vec<_> = addresses.iter().map(|a| at(a, "Ikeja", "Lagos")).collect();
            let got = suggestions(&props, &query);

            prop_assert!(got.len() <= MAX_SUGGESTIONS);
            let unique: HashSet<_> = got.iter().collect();
            prop_assert_eq!(unique.len(), got.len());
            let needle = query.to_lowercase();
            prop_assert!(got.iter().all(|s| s.to_lowercase().contains(&needle)));
        }
    }
}
