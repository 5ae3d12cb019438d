//! Geocoding providers: Nominatim free-form, Nominatim structured, Photon.
//!
//! Both Nominatim adapters share one backend and therefore one rate gate.
//! Empty result sets are `Ok(None)`; anything that is neither a hit nor a
//! clean "no match" is a [`ProviderError`].

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;

use super::types::{Hit, ProviderError, ProviderErrorKind, Query, Strategy};
use crate::config::{CityBounds, GeocoderConfig};

pub const NOMINATIM: &str = "nominatim";
pub const NOMINATIM_STRUCTURED: &str = "nominatim_struct";
pub const PHOTON: &str = "photon";

/// What a provider may use besides the query itself.
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    /// Known bounding box for the venue's locality, if any.
    pub bounds: Option<&'a CityBounds>,
}

/// Uniform interface over geocoding back-ends.
pub trait Provider {
    fn name(&self) -> &str;

    fn search(&self, strategy: &Strategy, ctx: &SearchContext<'_>) -> Result<Option<Hit>, ProviderError>;
}

// ─── Rate gate ──────────────────────────────────────────────────

/// Minimum spacing between calls to one backend, measured from the end of
/// the previous call. Calls that never happened impose no wait.
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Wait out the remaining interval, run `call`, and start a new interval
    /// whatever the outcome.
    pub fn run<T>(&self, call: impl FnOnce() -> T) -> T {
        let mut last = self.last_call.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        let out = call();
        *last = Some(Instant::now());
        out
    }
}

// ─── HTTP client ────────────────────────────────────────────────

/// Blocking HTTP client with a per-call timeout and identifying headers.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    accept_language: String,
}

impl HttpClient {
    pub fn new(user_agent: &str, accept_language: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build();
        Self {
            agent,
            accept_language: accept_language.to_string(),
        }
    }

    pub fn from_config(config: &GeocoderConfig) -> Self {
        Self::new(&config.client_identifier(), &config.accept_language, config.timeout())
    }

    /// GET `url` with query parameters and return the body text.
    pub fn get(&self, provider: &str, url: &str, params: &[(&str, String)]) -> Result<String, ProviderError> {
        let mut request = self.agent.get(url).set("Accept-Language", &self.accept_language);
        for (key, value) in params {
            request = request.query(key, value);
        }

        let response = request.call().map_err(|e| classify_failure(provider, e))?;
        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(ProviderError::new(provider, ProviderErrorKind::Transport, format!("HTTP {status}")));
        }
        response
            .into_string()
            .map_err(|e| ProviderError::new(provider, ProviderErrorKind::Transport, e.to_string()))
    }
}

fn classify_failure(provider: &str, error: ureq::Error) -> ProviderError {
    match error {
        ureq::Error::Status(code, response) => {
            let kind = match code {
                429 => ProviderErrorKind::RateLimited,
                403 => ProviderErrorKind::Forbidden,
                _ => ProviderErrorKind::Transport,
            };
            let body: String = response.into_string().unwrap_or_default().chars().take(120).collect();
            ProviderError::new(provider, kind, format!("HTTP {code}: {}", body.trim()))
        }
        ureq::Error::Transport(transport) => {
            ProviderError::new(provider, ProviderErrorKind::Transport, transport.to_string())
        }
    }
}

// ─── Nominatim ──────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

fn parse_nominatim(provider: &str, body: &str) -> Result<Option<Hit>, ProviderError> {
    let places: Vec<NominatimPlace> = serde_json::from_str(body)
        .map_err(|e| ProviderError::new(provider, ProviderErrorKind::Malformed, e.to_string()))?;
    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };

    let coord = |raw: &str| {
        raw.trim()
            .parse::<f64>()
            .map_err(|e| ProviderError::new(provider, ProviderErrorKind::Malformed, format!("bad coordinate '{raw}': {e}")))
    };
    Ok(Some(Hit {
        lat: coord(&place.lat)?,
        lon: coord(&place.lon)?,
        label: place.display_name,
        provider: provider.to_string(),
    }))
}

/// Shared state of the Nominatim backend: endpoint, client, rate budget.
pub struct NominatimBackend {
    http: HttpClient,
    endpoint: String,
    gate: RateGate,
    country_code: String,
    contact_email: String,
}

impl NominatimBackend {
    pub fn new(
        http: HttpClient,
        endpoint: impl Into<String>,
        min_interval: Duration,
        country_code: impl Into<String>,
        contact_email: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            gate: RateGate::new(min_interval),
            country_code: country_code.into(),
            contact_email: contact_email.into(),
        }
    }

    pub fn from_config(http: HttpClient, config: &GeocoderConfig) -> Arc<Self> {
        Arc::new(Self::new(
            http,
            config.nominatim_url.clone(),
            config.min_interval(),
            config.country_code.clone(),
            config.contact_email.clone(),
        ))
    }

    fn common_params(&self, bounds: Option<&CityBounds>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("format", "json".to_string()),
            ("limit", "1".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        if !self.country_code.is_empty() {
            params.push(("countrycodes", self.country_code.clone()));
        }
        if !self.contact_email.is_empty() {
            params.push(("email", self.contact_email.clone()));
        }
        if let Some(b) = bounds {
            params.push(("viewbox", b.viewbox()));
            params.push(("bounded", "1".to_string()));
        }
        params
    }

    fn fetch(&self, provider: &str, params: &[(&str, String)]) -> Result<Option<Hit>, ProviderError> {
        self.gate.run(|| {
            let body = self.http.get(provider, &self.endpoint, params)?;
            parse_nominatim(provider, &body)
        })
    }
}

/// Free-form Nominatim search, country-restricted and geofenced to known
/// major cities.
pub struct NominatimSearch {
    backend: Arc<NominatimBackend>,
}

impl NominatimSearch {
    pub fn new(backend: Arc<NominatimBackend>) -> Self {
        Self { backend }
    }
}

impl Provider for NominatimSearch {
    fn name(&self) -> &str {
        NOMINATIM
    }

    fn search(&self, strategy: &Strategy, ctx: &SearchContext<'_>) -> Result<Option<Hit>, ProviderError> {
        let Some(text) = strategy.text().filter(|t| !t.trim().is_empty()) else {
            return Ok(None);
        };
        let mut params = vec![("q", text.to_string())];
        params.extend(self.backend.common_params(ctx.bounds));
        self.backend.fetch(NOMINATIM, &params)
    }
}

/// Structured Nominatim search. Never calls out with a blank field.
pub struct NominatimStructured {
    backend: Arc<NominatimBackend>,
    country: String,
}

impl NominatimStructured {
    pub fn new(backend: Arc<NominatimBackend>, country: impl Into<String>) -> Self {
        Self {
            backend,
            country: country.into(),
        }
    }
}

impl Provider for NominatimStructured {
    fn name(&self) -> &str {
        NOMINATIM_STRUCTURED
    }

    fn search(&self, strategy: &Strategy, ctx: &SearchContext<'_>) -> Result<Option<Hit>, ProviderError> {
        let Query::Structured { street, house_number, city } = &strategy.query else {
            return Ok(None);
        };
        let (street, house_number, city) = (street.trim(), house_number.trim(), city.trim());
        if street.is_empty() || house_number.is_empty() || city.is_empty() {
            return Ok(None);
        }

        let mut params = vec![
            ("street", format!("{street} {house_number}")),
            ("city", city.to_string()),
        ];
        if !self.country.is_empty() {
            params.push(("country", self.country.clone()));
        }
        params.extend(self.backend.common_params(ctx.bounds));
        self.backend.fetch(NOMINATIM_STRUCTURED, &params)
    }
}

// ─── Photon ─────────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct PhotonResponse {
    #[serde(default)]
    features: Vec<PhotonFeature>,
}

#[derive(Deserialize, Debug)]
struct PhotonFeature {
    geometry: PhotonGeometry,
    #[serde(default)]
    properties: PhotonProperties,
}

#[derive(Deserialize, Debug)]
struct PhotonGeometry {
    coordinates: Vec<f64>,
}

#[derive(Deserialize, Debug, Default)]
struct PhotonProperties {
    name: Option<String>,
    street: Option<String>,
    housenumber: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

impl PhotonProperties {
    /// Photon has no display name; build one from the address parts.
    fn label(&self) -> String {
        let street = match (&self.street, &self.housenumber) {
            (Some(s), Some(n)) => Some(format!("{s} {n}")),
            (Some(s), None) => Some(s.clone()),
            _ => None,
        };
        [self.name.clone(), street, self.city.clone(), self.state.clone(), self.country.clone()]
            .into_iter()
            .flatten()
            .filter(|p| !p.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn parse_photon(body: &str) -> Result<Option<Hit>, ProviderError> {
    let response: PhotonResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::new(PHOTON, ProviderErrorKind::Malformed, e.to_string()))?;
    let Some(feature) = response.features.into_iter().next() else {
        return Ok(None);
    };
    let &[lon, lat] = feature.geometry.coordinates.as_slice() else {
        return Err(ProviderError::new(
            PHOTON,
            ProviderErrorKind::Malformed,
            format!("expected [lon, lat], got {:?}", feature.geometry.coordinates),
        ));
    };
    Ok(Some(Hit {
        lat,
        lon,
        label: feature.properties.label(),
        provider: PHOTON.to_string(),
    }))
}

/// Secondary free-form provider. No geofence and no rate gate of its own.
pub struct Photon {
    http: HttpClient,
    endpoint: String,
}

impl Photon {
    pub fn new(http: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

impl Provider for Photon {
    fn name(&self) -> &str {
        PHOTON
    }

    fn search(&self, strategy: &Strategy, _ctx: &SearchContext<'_>) -> Result<Option<Hit>, ProviderError> {
        let Some(text) = strategy.text().filter(|t| !t.trim().is_empty()) else {
            return Ok(None);
        };
        let params = [("q", text.to_string()), ("limit", "1".to_string())];
        let body = self.http.get(PHOTON, &self.endpoint, &params)?;
        parse_photon(&body)
    }
}
