use tracing::warn;

use crate::errors::AppError;
use crate::maps_api::{MapsApi, TextSearchRequest, STATUS_OK};
use crate::resolution::{PlaceDetails, ResolutionResult, ResolutionSource, ResolutionStatus};

pub const MISSING_LOCATION: &str = "MISSING_LOCATION";
pub const MISSING_PLACE_ID: &str = "MISSING_PLACE_ID";

/// Why a details fetch or candidate search gave nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    /// Upstream answered with a non-OK status, an empty list, or a payload
    /// missing a required field.
    Rejected(String),
    Transport(String),
}

impl LookupFailure {
    fn from_error(err: AppError) -> Self {
        LookupFailure::Transport(err.to_string())
    }
}

/// Place Details for an identifier.
pub async fn fetch_place_details(
    api: &dyn MapsApi,
    place_id: &str,
) -> Result<PlaceDetails, LookupFailure> {
    let response = api
        .place_details(place_id)
        .await
        .map_err(LookupFailure::from_error)?;
    if response.status != STATUS_OK {
        return Err(LookupFailure::Rejected(response.status));
    }
    let payload = response
        .result
        .ok_or_else(|| LookupFailure::Rejected(MISSING_LOCATION.into()))?;
    let location = payload
        .geometry
        .as_ref()
        .and_then(|geometry| geometry.coordinates())
        .ok_or_else(|| LookupFailure::Rejected(MISSING_LOCATION.into()))?;

    Ok(PlaceDetails {
        place_id: place_id.to_string(),
        name: payload.name,
        formatted_address: payload.formatted_address,
        location,
    })
}

/// Tier 1: Find Place From Text, then details for the best candidate.
/// Upstream and transport failures come back as the result status.
pub async fn direct_place_lookup(api: &dyn MapsApi, query: &str) -> ResolutionResult {
    let source = ResolutionSource::PlacesFindPlace;
    let search = match api.find_place(query).await {
        Ok(search) => search,
        Err(err) => {
            warn!(?err, query, "find place request failed");
            return ResolutionResult::failure(ResolutionStatus::Exception(err.to_string()), source);
        }
    };

    if search.status != STATUS_OK {
        return ResolutionResult::failure(ResolutionStatus::NotFoundInPlaces(search.status), source);
    }
    let Some(candidate) = search.candidates.into_iter().next() else {
        return ResolutionResult::failure(ResolutionStatus::NotFoundInPlaces(search.status), source);
    };
    let Some(place_id) = candidate.place_id else {
        return ResolutionResult::failure(
            ResolutionStatus::NotFoundInPlaces(MISSING_PLACE_ID.into()),
            source,
        );
    };

    match fetch_place_details(api, &place_id).await {
        Ok(details) => ResolutionResult::from_place(source, details),
        Err(LookupFailure::Rejected(status)) => {
            ResolutionResult::failure(ResolutionStatus::NotFoundInPlaces(status), source)
        }
        Err(LookupFailure::Transport(message)) => {
            warn!(%message, place_id, "place details request failed");
            ResolutionResult::failure(ResolutionStatus::Exception(message), source)
        }
    }
}

/// Tier 2 search step: identifier of the first text-search hit.
pub async fn text_search_place_id(
    api: &dyn MapsApi,
    request: &TextSearchRequest<'_>,
) -> Result<String, LookupFailure> {
    let response = api
        .text_search(request)
        .await
        .map_err(LookupFailure::from_error)?;
    if response.status != STATUS_OK {
        return Err(LookupFailure::Rejected(response.status));
    }
    let Some(first) = response.results.into_iter().next() else {
        return Err(LookupFailure::Rejected(response.status));
    };
    first
        .place_id
        .ok_or_else(|| LookupFailure::Rejected(MISSING_PLACE_ID.into()))
}

/// Tier 3, also used to find city centroids: plain address geocoding.
/// Never errors; failures are folded into the status.
pub async fn geocode_fallback(api: &dyn MapsApi, address: &str) -> ResolutionResult {
    let source = ResolutionSource::GeocodingApi;
    let response = match api.geocode(address).await {
        Ok(response) => response,
        Err(err) => {
            warn!(?err, address, "geocode request failed");
            return ResolutionResult::failure(ResolutionStatus::Exception(err.to_string()), source);
        }
    };

    if response.status != STATUS_OK {
        return ResolutionResult::failure(
            ResolutionStatus::GeocodeRejected(response.status),
            source,
        );
    }
    let Some(first) = response.results.into_iter().next() else {
        return ResolutionResult::failure(
            ResolutionStatus::GeocodeRejected(response.status),
            source,
        );
    };
    match first.geometry.as_ref().and_then(|geometry| geometry.coordinates()) {
        Some(location) => {
            ResolutionResult::success(source, location, first.formatted_address, None, None)
        }
        None => ResolutionResult::failure(
            ResolutionStatus::GeocodeRejected(MISSING_LOCATION.into()),
            source,
        ),
    }
}
