use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// `"lat,lng"` as the Places text-search `location` parameter expects it.
    pub fn as_query_value(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// Fields pulled out of a successful Place Details response.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceDetails {
    pub place_id: String,
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    pub location: Coordinates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    PlacesFindPlace,
    PlacesTextSearch,
    PlacesTextSearchLowQuality,
    GeocodingApi,
    None,
}

impl ResolutionSource {
    pub fn as_tag(&self) -> &'static str {
        match self {
            ResolutionSource::PlacesFindPlace => "places_findplace",
            ResolutionSource::PlacesTextSearch => "places_textsearch",
            ResolutionSource::PlacesTextSearchLowQuality => "places_textsearch_low_quality",
            ResolutionSource::GeocodingApi => "geocoding_api",
            ResolutionSource::None => "none",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl Serialize for ResolutionSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStatus {
    Success,
    SkippedEmpty,
    /// Direct lookup produced no usable place; carries the upstream status.
    NotFoundInPlaces(String),
    /// Geocoding answered with a non-OK status.
    GeocodeRejected(String),
    /// Transport, timeout or decode failure.
    Exception(String),
}

impl ResolutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ResolutionStatus::Success)
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStatus::Success => f.write_str("success"),
            ResolutionStatus::SkippedEmpty => f.write_str("skipped-empty"),
            ResolutionStatus::NotFoundInPlaces(upstream) => {
                write!(f, "not_found_in_places:{upstream}")
            }
            ResolutionStatus::GeocodeRejected(upstream) => write!(f, "Error: {upstream}"),
            ResolutionStatus::Exception(message) => write!(f, "Exception: {message}"),
        }
    }
}

impl Serialize for ResolutionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of resolving one query.
///
/// Coordinates are present exactly when the status is `success`; the two
/// constructors are the only way to build a value.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    coordinates: Option<Coordinates>,
    formatted_address: Option<String>,
    resolved_name: Option<String>,
    status: ResolutionStatus,
    source: ResolutionSource,
    place_id: Option<String>,
}

impl ResolutionResult {
    pub fn success(
        source: ResolutionSource,
        coordinates: Coordinates,
        formatted_address: Option<String>,
        resolved_name: Option<String>,
        place_id: Option<String>,
    ) -> Self {
        Self {
            coordinates: Some(coordinates),
            formatted_address,
            resolved_name,
            status: ResolutionStatus::Success,
            source,
            place_id,
        }
    }

    pub fn from_place(source: ResolutionSource, details: PlaceDetails) -> Self {
        Self::success(
            source,
            details.location,
            details.formatted_address,
            details.name,
            Some(details.place_id),
        )
    }

    pub fn failure(status: ResolutionStatus, source: ResolutionSource) -> Self {
        debug_assert!(!status.is_success());
        Self {
            coordinates: None,
            formatted_address: None,
            resolved_name: None,
            status,
            source,
            place_id: None,
        }
    }

    pub fn skipped_empty() -> Self {
        Self::failure(ResolutionStatus::SkippedEmpty, ResolutionSource::None)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }

    pub fn formatted_address(&self) -> Option<&str> {
        self.formatted_address.as_deref()
    }

    pub fn resolved_name(&self) -> Option<&str> {
        self.resolved_name.as_deref()
    }

    pub fn status(&self) -> &ResolutionStatus {
        &self.status
    }

    pub fn source(&self) -> ResolutionSource {
        self.source
    }

    pub fn place_id(&self) -> Option<&str> {
        self.place_id.as_deref()
    }
}

impl Serialize for ResolutionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResolutionResult", 7)?;
        state.serialize_field("latitude", &self.latitude())?;
        state.serialize_field("longitude", &self.longitude())?;
        state.serialize_field("formatted_address", &self.formatted_address)?;
        state.serialize_field("resolved_name", &self.resolved_name)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("place_id", &self.place_id)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_status_vocabulary() {
        assert_eq!(ResolutionStatus::Success.to_string(), "success");
        assert_eq!(ResolutionStatus::SkippedEmpty.to_string(), "skipped-empty");
        assert_eq!(
            ResolutionStatus::NotFoundInPlaces("ZERO_RESULTS".into()).to_string(),
            "not_found_in_places:ZERO_RESULTS"
        );
        assert_eq!(
            ResolutionStatus::GeocodeRejected("OVER_QUERY_LIMIT".into()).to_string(),
            "Error: OVER_QUERY_LIMIT"
        );
        assert_eq!(
            ResolutionStatus::Exception("timed out".into()).to_string(),
            "Exception: timed out"
        );
    }

    #[test]
    fn failure_carries_no_coordinates() {
        let result = ResolutionResult::failure(
            ResolutionStatus::GeocodeRejected("ZERO_RESULTS".into()),
            ResolutionSource::GeocodingApi,
        );
        assert!(!result.is_success());
        assert!(result.latitude().is_none());
        assert!(result.longitude().is_none());
    }

    #[test]
    fn serializes_flat_record() {
        let result = ResolutionResult::success(
            ResolutionSource::PlacesTextSearchLowQuality,
            Coordinates::new(52.37, 4.89),
            Some("Amsterdam, Netherlands".into()),
            Some("Amsterdam".into()),
            Some("place-1".into()),
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["latitude"], 52.37);
        assert_eq!(value["longitude"], 4.89);
        assert_eq!(value["status"], "success");
        assert_eq!(value["source"], "places_textsearch_low_quality");
        assert_eq!(value["place_id"], "place-1");
    }

    #[test]
    fn skipped_empty_uses_none_source() {
        let result = ResolutionResult::skipped_empty();
        assert_eq!(result.status(), &ResolutionStatus::SkippedEmpty);
        assert_eq!(result.source().as_tag(), "none");
        assert!(result.coordinates().is_none());
    }
}
