pub mod batch;
pub mod centroid;
pub mod config;
pub mod engine;
pub mod errors;
pub mod maps_api;
pub mod providers;
pub mod quality;
pub mod query;
pub mod resolution;

#[cfg(test)]
mod test_support;

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use batch::{
    default_output_path, inspect_input, read_input, write_output, BatchInput, BatchProgress,
    BatchReport, BatchRunner, BatchSummary, InspectReport,
};
pub use centroid::CityCentroidCache;
pub use config::{AppConfig, PublicAppConfig};
pub use engine::{
    BiasedTextSearchTier, DirectLookupTier, GeocodeFallbackTier, ResolutionTier, Resolver,
    ResolverOptions, TierContext, TierOutcome,
};
pub use errors::{AppError, AppResult};
pub use maps_api::{HttpMapsClient, MapsApi};
pub use quality::is_locality_level;
pub use query::{normalize, QueryShape, ResolutionQuery};
pub use resolution::{Coordinates, ResolutionResult, ResolutionSource, ResolutionStatus};

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,venue_geocoder=debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
