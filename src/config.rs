use std::{env, io};

use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

use crate::errors::{AppError, AppResult};

pub const DEFAULT_MAPS_API_BASE: &str = "https://maps.googleapis.com/maps/api";
pub const DEFAULT_PLACES_CATEGORY: &str = "tourist_attraction";
pub const DEFAULT_TEXT_SEARCH_RADIUS_M: u32 = 50_000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
const DEFAULT_BATCH_DELAY_MS: u64 = 250;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub google_api_key: Option<SecretString>,
    pub maps_api_base: String,
    pub places_category: Option<String>,
    pub text_search_radius_m: u32,
    pub http_timeout_secs: u64,
    pub batch_delay_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicAppConfig {
    pub maps_api_base: String,
    pub places_category: Option<String>,
    pub text_search_radius_m: u32,
    pub http_timeout_secs: u64,
    pub batch_delay_ms: u64,
    pub has_google_api_key: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            maps_api_base: DEFAULT_MAPS_API_BASE.to_string(),
            places_category: Some(DEFAULT_PLACES_CATEGORY.to_string()),
            text_search_radius_m: DEFAULT_TEXT_SEARCH_RADIUS_M,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        Self {
            google_api_key: env::var("GOOGLE_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
            maps_api_base: env::var("GOOGLE_MAPS_API_BASE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_MAPS_API_BASE.to_string()),
            // An explicitly empty category disables the filter.
            places_category: match env::var("PLACES_CATEGORY") {
                Ok(value) if value.trim().is_empty() => None,
                Ok(value) => Some(value.trim().to_string()),
                Err(_) => Some(DEFAULT_PLACES_CATEGORY.to_string()),
            },
            text_search_radius_m: parse_u32("TEXT_SEARCH_RADIUS_M", DEFAULT_TEXT_SEARCH_RADIUS_M),
            http_timeout_secs: parse_u64("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS).max(1),
            batch_delay_ms: parse_u64("BATCH_DELAY_MS", DEFAULT_BATCH_DELAY_MS),
        }
    }

    pub fn require_api_key(&self) -> AppResult<SecretString> {
        self.google_api_key.clone().ok_or_else(|| {
            AppError::Config("GOOGLE_API_KEY is not set; Places and Geocoding need it".into())
        })
    }

    pub fn public_profile(&self) -> PublicAppConfig {
        PublicAppConfig {
            maps_api_base: self.maps_api_base.clone(),
            places_category: self.places_category.clone(),
            text_search_radius_m: self.text_search_radius_m,
            http_timeout_secs: self.http_timeout_secs,
            batch_delay_ms: self.batch_delay_ms,
            has_google_api_key: self.google_api_key.is_some(),
        }
    }
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_public_profile_without_secrets() {
        env::set_var("GOOGLE_API_KEY", "secret");
        env::set_var("GOOGLE_MAPS_API_BASE", "http://localhost:9000/maps/api/");
        env::set_var("PLACES_CATEGORY", "");
        env::set_var("TEXT_SEARCH_RADIUS_M", "1000");
        env::set_var("BATCH_DELAY_MS", "not-a-number");

        let config = AppConfig::from_env();
        let public = config.public_profile();

        assert!(public.has_google_api_key);
        assert!(config.require_api_key().is_ok());
        assert_eq!(public.maps_api_base, "http://localhost:9000/maps/api");
        assert_eq!(public.places_category, None);
        assert_eq!(public.text_search_radius_m, 1000);
        assert_eq!(public.batch_delay_ms, DEFAULT_BATCH_DELAY_MS);
        assert!(!serde_json::to_string(&public).unwrap().contains("secret"));
    }

    #[test]
    fn default_config_has_no_key() {
        let config = AppConfig::default();
        assert!(config.require_api_key().is_err());
        assert_eq!(config.places_category.as_deref(), Some(DEFAULT_PLACES_CATEGORY));
        assert_eq!(config.text_search_radius_m, 50_000);
    }
}
