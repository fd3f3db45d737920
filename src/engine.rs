use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::centroid::CityCentroidCache;
use crate::config::{AppConfig, DEFAULT_PLACES_CATEGORY, DEFAULT_TEXT_SEARCH_RADIUS_M};
use crate::maps_api::{MapsApi, TextSearchRequest};
use crate::providers::{
    direct_place_lookup, fetch_place_details, geocode_fallback, text_search_place_id,
    LookupFailure,
};
use crate::quality::is_locality_level;
use crate::query::{normalize, NormalizedQuery, QueryShape, ResolutionQuery};
use crate::resolution::{ResolutionResult, ResolutionSource, ResolutionStatus};

/// Everything a tier may consult while resolving one query.
pub struct TierContext<'a> {
    pub query: &'a NormalizedQuery,
    pub api: &'a dyn MapsApi,
    pub centroids: &'a CityCentroidCache,
}

#[derive(Debug)]
pub enum TierOutcome {
    Accept(ResolutionResult),
    /// Hand over to the next tier, optionally leaving a result to report if
    /// no later tier accepts.
    Continue(Option<ResolutionResult>),
}

#[async_trait]
pub trait ResolutionTier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn attempt(&self, ctx: &TierContext<'_>) -> TierOutcome;
}

/// Find Place -> Details. Accepts only street-level matches.
pub struct DirectLookupTier;

#[async_trait]
impl ResolutionTier for DirectLookupTier {
    fn name(&self) -> &'static str {
        "direct_lookup"
    }

    async fn attempt(&self, ctx: &TierContext<'_>) -> TierOutcome {
        let result = direct_place_lookup(ctx.api, &ctx.query.text).await;
        if result.is_success() && !is_locality_level(result.formatted_address()) {
            return TierOutcome::Accept(result);
        }
        TierOutcome::Continue(Some(result))
    }
}

/// Category-filtered text search, biased to the city centroid when one is known.
pub struct BiasedTextSearchTier {
    pub radius_m: u32,
    pub category: Option<String>,
}

impl Default for BiasedTextSearchTier {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_TEXT_SEARCH_RADIUS_M,
            category: Some(DEFAULT_PLACES_CATEGORY.to_string()),
        }
    }
}

#[async_trait]
impl ResolutionTier for BiasedTextSearchTier {
    fn name(&self) -> &'static str {
        "biased_text_search"
    }

    async fn attempt(&self, ctx: &TierContext<'_>) -> TierOutcome {
        let bias = match ctx.query.city.as_deref() {
            Some(city) => ctx.centroids.get_or_resolve(ctx.api, city).await,
            None => None,
        };
        let request = TextSearchRequest {
            query: &ctx.query.text,
            bias,
            radius_m: self.radius_m,
            category: self.category.as_deref(),
        };

        let place_id = match text_search_place_id(ctx.api, &request).await {
            Ok(place_id) => place_id,
            Err(failure) => {
                log_failure("text search", &ctx.query.text, &failure);
                return TierOutcome::Continue(None);
            }
        };

        match fetch_place_details(ctx.api, &place_id).await {
            Ok(details) => {
                // Coarse matches are still kept here, only tagged.
                let source = if is_locality_level(details.formatted_address.as_deref()) {
                    ResolutionSource::PlacesTextSearchLowQuality
                } else {
                    ResolutionSource::PlacesTextSearch
                };
                TierOutcome::Accept(ResolutionResult::from_place(source, details))
            }
            Err(failure) => {
                log_failure("text search details", &place_id, &failure);
                TierOutcome::Continue(None)
            }
        }
    }
}

/// Plain geocoding of the query. Always terminal.
pub struct GeocodeFallbackTier;

#[async_trait]
impl ResolutionTier for GeocodeFallbackTier {
    fn name(&self) -> &'static str {
        "geocode_fallback"
    }

    async fn attempt(&self, ctx: &TierContext<'_>) -> TierOutcome {
        TierOutcome::Accept(geocode_fallback(ctx.api, &ctx.query.text).await)
    }
}

fn log_failure(step: &str, subject: &str, failure: &LookupFailure) {
    match failure {
        LookupFailure::Rejected(status) => {
            debug!(step, subject, %status, "no usable candidate")
        }
        LookupFailure::Transport(message) => warn!(step, subject, %message, "request failed"),
    }
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub text_search_radius_m: u32,
    pub places_category: Option<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        let tier = BiasedTextSearchTier::default();
        Self {
            text_search_radius_m: tier.radius_m,
            places_category: tier.category,
        }
    }
}

impl From<&AppConfig> for ResolverOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            text_search_radius_m: config.text_search_radius_m,
            places_category: config.places_category.clone(),
        }
    }
}

pub fn default_tiers(options: &ResolverOptions) -> Vec<Box<dyn ResolutionTier>> {
    vec![
        Box::new(DirectLookupTier),
        Box::new(BiasedTextSearchTier {
            radius_m: options.text_search_radius_m,
            category: options.places_category.clone(),
        }),
        Box::new(GeocodeFallbackTier),
    ]
}

/// Runs the ordered tiers for each query. Never fails: every path ends in a
/// `ResolutionResult`.
pub struct Resolver {
    api: Arc<dyn MapsApi>,
    centroids: Arc<CityCentroidCache>,
    tiers: Vec<Box<dyn ResolutionTier>>,
}

impl Resolver {
    pub fn new(
        api: Arc<dyn MapsApi>,
        centroids: Arc<CityCentroidCache>,
        options: &ResolverOptions,
    ) -> Self {
        Self::with_tiers(api, centroids, default_tiers(options))
    }

    pub fn with_tiers(
        api: Arc<dyn MapsApi>,
        centroids: Arc<CityCentroidCache>,
        tiers: Vec<Box<dyn ResolutionTier>>,
    ) -> Self {
        Self {
            api,
            centroids,
            tiers,
        }
    }

    pub fn centroids(&self) -> &CityCentroidCache {
        &self.centroids
    }

    pub async fn resolve(&self, query: &ResolutionQuery) -> ResolutionResult {
        let normalized = match normalize(query) {
            QueryShape::Skip => return ResolutionResult::skipped_empty(),
            QueryShape::Lookup(normalized) => normalized,
        };

        let ctx = TierContext {
            query: &normalized,
            api: self.api.as_ref(),
            centroids: &self.centroids,
        };

        let mut carried = None;
        for tier in &self.tiers {
            match tier.attempt(&ctx).await {
                TierOutcome::Accept(result) => {
                    debug!(
                        tier = tier.name(),
                        query = %normalized.text,
                        status = %result.status(),
                        source = %result.source(),
                        "tier accepted"
                    );
                    return result;
                }
                TierOutcome::Continue(result) => {
                    debug!(tier = tier.name(), query = %normalized.text, "tier passed");
                    if result.is_some() {
                        carried = result;
                    }
                }
            }
        }

        carried.unwrap_or_else(|| {
            ResolutionResult::failure(
                ResolutionStatus::NotFoundInPlaces("UNRESOLVED".into()),
                ResolutionSource::None,
            )
        })
    }
}
