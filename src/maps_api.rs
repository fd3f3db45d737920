use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::trace;

use crate::config::AppConfig;
use crate::errors::AppResult;
use crate::resolution::Coordinates;

/// Status value every Maps web-service endpoint reports on success.
pub const STATUS_OK: &str = "OK";

const USER_AGENT: &str = concat!("venue-geocoder/", env!("CARGO_PKG_VERSION"));
const FIND_PLACE_FIELDS: &str = "place_id";
const DETAILS_FIELDS: &str = "name,formatted_address,geometry";

#[derive(Debug, Clone, Deserialize)]
pub struct FindPlaceResponse {
    pub status: String,
    #[serde(default)]
    pub candidates: Vec<PlaceCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextSearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<PlaceCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceCandidate {
    pub place_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceDetailsResponse {
    pub status: String,
    pub result: Option<PlaceDetailsPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceDetailsPayload {
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodePayload {
    pub formatted_address: Option<String>,
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    pub location: Option<LatLng>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatLng {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl Geometry {
    /// Both halves of the location, or nothing.
    pub fn coordinates(&self) -> Option<Coordinates> {
        let location = self.location.as_ref()?;
        Some(Coordinates::new(location.lat?, location.lng?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSearchRequest<'a> {
    pub query: &'a str,
    pub bias: Option<Coordinates>,
    pub radius_m: u32,
    pub category: Option<&'a str>,
}

/// Raw calls against the four Maps endpoints the resolver uses.
///
/// Implementations return `Err` only for transport or decode failures; a
/// non-OK `status` comes back as a normal response.
#[async_trait]
pub trait MapsApi: Send + Sync {
    async fn find_place(&self, input: &str) -> AppResult<FindPlaceResponse>;
    async fn place_details(&self, place_id: &str) -> AppResult<PlaceDetailsResponse>;
    async fn text_search(&self, request: &TextSearchRequest<'_>) -> AppResult<TextSearchResponse>;
    async fn geocode(&self, address: &str) -> AppResult<GeocodeResponse>;
}

pub struct HttpMapsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl HttpMapsClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let api_key = config.require_api_key()?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.maps_api_base.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn shared(config: &AppConfig) -> AppResult<Arc<dyn MapsApi>> {
        Ok(Arc::new(Self::new(config)?))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}/{}", self.base_url, path);
        trace!(%url, "maps api request");
        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.expose_secret())])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(reqwest::Error::without_url)?;
        Ok(response.json().await.map_err(reqwest::Error::without_url)?)
    }
}

#[async_trait]
impl MapsApi for HttpMapsClient {
    async fn find_place(&self, input: &str) -> AppResult<FindPlaceResponse> {
        self.get_json(
            "place/findplacefromtext/json",
            &[
                ("input", input.to_string()),
                ("inputtype", "textquery".to_string()),
                ("fields", FIND_PLACE_FIELDS.to_string()),
            ],
        )
        .await
    }

    async fn place_details(&self, place_id: &str) -> AppResult<PlaceDetailsResponse> {
        self.get_json(
            "place/details/json",
            &[
                ("place_id", place_id.to_string()),
                ("fields", DETAILS_FIELDS.to_string()),
            ],
        )
        .await
    }

    async fn text_search(&self, request: &TextSearchRequest<'_>) -> AppResult<TextSearchResponse> {
        let mut params = vec![("query", request.query.to_string())];
        if let Some(bias) = request.bias {
            params.push(("location", bias.as_query_value()));
            params.push(("radius", request.radius_m.to_string()));
        }
        if let Some(category) = request.category {
            params.push(("type", category.to_string()));
        }
        self.get_json("place/textsearch/json", &params).await
    }

    async fn geocode(&self, address: &str) -> AppResult<GeocodeResponse> {
        self.get_json("geocode/json", &[("address", address.to_string())])
            .await
    }
}
