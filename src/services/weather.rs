use std::time::Duration;

use chrono::NaiveDateTime;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::WeatherConfig;
use crate::error::{AppError, AppResult};

const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

/// Forecast lookup against the OpenWeatherMap geocoding + 5-day forecast APIs.
///
/// Weather is an enrichment, never a hard dependency: every failure mode
/// (no API key, geocoding miss, transport or parse error) is logged and
/// reported as `None` so read paths keep working without it.
#[derive(Clone)]
pub struct WeatherService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

/// Ephemeral, computed per request, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherInfo {
    pub temperature: f64,
    pub description: String,
    pub icon: String,
    /// Probability of precipitation, percent.
    pub precipitation: f64,
}

// ============================================================================
// OpenWeatherMap response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ForecastEntry {
    /// Unix timestamp of the forecast bucket.
    dt: i64,
    main: ForecastMain,
    weather: Vec<ForecastCondition>,
    /// Probability of precipitation in [0,1].
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ForecastMain {
    temp: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ForecastCondition {
    description: String,
    icon: String,
}

impl WeatherService {
    pub fn new(config: &WeatherConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(AppError::Request)?;

        if config.api_key.is_none() {
            tracing::warn!("OPENWEATHER_API_KEY not set; weather lookups disabled");
        }

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: OPENWEATHER_BASE_URL.to_string(),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Forecast sample closest in time to `date` (interpreted as UTC).
    /// Returns `None` when weather is unavailable for any reason.
    pub async fn forecast(&self, location: &str, date: NaiveDateTime) -> Option<WeatherInfo> {
        let api_key = self.api_key.as_deref()?;

        match self.lookup(api_key, location, date).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Weather lookup failed for {location}: {e}");
                None
            }
        }
    }

    async fn lookup(
        &self,
        api_key: &str,
        location: &str,
        date: NaiveDateTime,
    ) -> AppResult<Option<WeatherInfo>> {
        let Some((lat, lon)) = self.geocode(api_key, location).await? else {
            tracing::warn!("No coordinates found for location: {location}");
            return Ok(None);
        };

        let url = format!("{}/data/2.5/forecast", self.base_url);
        let response: ForecastResponse = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", api_key.to_string()),
                ("units", "imperial".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let target = date.and_utc().timestamp();
        Ok(closest_entry(&response.list, target).map(|entry| WeatherInfo {
            temperature: entry.main.temp,
            description: entry
                .weather
                .first()
                .map(|c| c.description.clone())
                .unwrap_or_default(),
            icon: entry
                .weather
                .first()
                .map(|c| c.icon.clone())
                .unwrap_or_default(),
            precipitation: entry.pop * 100.0,
        }))
    }

    async fn geocode(&self, api_key: &str, location: &str) -> AppResult<Option<(f64, f64)>> {
        let url = format!("{}/geo/1.0/direct", self.base_url);
        let entries: Vec<GeocodeEntry> = self
            .client
            .get(&url)
            .query(&[("q", location), ("limit", "1"), ("appid", api_key)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(entries.first().map(|e| (e.lat, e.lon)))
    }
}

/// Entry with the minimum absolute distance to the target timestamp.
fn closest_entry(entries: &[ForecastEntry], target: i64) -> Option<&ForecastEntry> {
    entries.iter().min_by_key(|e| (e.dt - target).abs())
}
