use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::maps_api::MapsApi;
use crate::providers::geocode_fallback;
use crate::resolution::Coordinates;

/// Run-scoped memo of city name -> centroid.
///
/// Only successful geocodes are stored, so a city that failed once is retried
/// on its next lookup. Safe to share between concurrent resolutions.
#[derive(Default)]
pub struct CityCentroidCache {
    entries: Mutex<HashMap<String, Coordinates>>,
}

impl CityCentroidCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, city: &str) -> Option<Coordinates> {
        self.entries.lock().get(city).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub async fn get_or_resolve(&self, api: &dyn MapsApi, city: &str) -> Option<Coordinates> {
        if let Some(hit) = self.get(city) {
            debug!(city, "city centroid cache hit");
            return Some(hit);
        }

        let result = geocode_fallback(api, city).await;
        match result.coordinates() {
            Some(centroid) => {
                self.entries.lock().insert(city.to_string(), centroid);
                Some(centroid)
            }
            None => {
                warn!(city, status = %result.status(), "city centroid lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{geocode_ok, FakeMapsApi};

    #[tokio::test]
    async fn memoizes_successful_lookups() {
        let api = FakeMapsApi::default().with_geocode("Paris", "Paris, France", 48.85, 2.35);
        let cache = CityCentroidCache::new();

        let first = cache.get_or_resolve(&api, "Paris").await;
        let second = cache.get_or_resolve(&api, "Paris").await;

        assert_eq!(first, Some(Coordinates::new(48.85, 2.35)));
        assert_eq!(first, second);
        assert_eq!(api.geocode_calls("Paris"), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_lookup_is_not_cached() {
        let api = FakeMapsApi::default().with_geocode_sequence(
            "Rome",
            vec![None, Some(geocode_ok("Rome, Italy", 41.9, 12.5))],
        );
        let cache = CityCentroidCache::new();

        assert_eq!(cache.get_or_resolve(&api, "Rome").await, None);
        assert!(cache.is_empty());

        assert_eq!(
            cache.get_or_resolve(&api, "Rome").await,
            Some(Coordinates::new(41.9, 12.5))
        );
        assert_eq!(api.geocode_calls("Rome"), 2);
    }

    #[tokio::test]
    async fn rejected_city_is_retried() {
        let api = FakeMapsApi::default();
        let cache = CityCentroidCache::new();

        assert!(cache.get_or_resolve(&api, "Atlantis").await.is_none());
        assert!(cache.get_or_resolve(&api, "Atlantis").await.is_none());
        assert_eq!(api.geocode_calls("Atlantis"), 2);
    }
}
