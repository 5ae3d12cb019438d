//! Geocoder configuration at ~/.venue-geocoder/config.json.
//!
//! Every field has a default, so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::geocode::types::ValidatorKind;

/// A province and the locality keywords that imply it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceRule {
    pub name: String,
    pub keywords: Vec<String>,
}

/// A known city with its bounding box (WGS84 degrees).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityBounds {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl CityBounds {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&lat) && (self.lon_min..=self.lon_max).contains(&lon)
    }

    /// Nominatim `viewbox` value: `left,top,right,bottom`.
    pub fn viewbox(&self) -> String {
        format!("{},{},{},{}", self.lon_min, self.lat_max, self.lon_max, self.lat_min)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub nominatim_url: String,
    pub photon_url: String,
    pub user_agent: String,
    pub contact_email: String,
    pub accept_language: String,
    pub timeout_secs: u64,
    /// Minimum gap between calls to the Nominatim backend.
    pub min_interval_ms: u64,
    pub country_code: String,
    pub country_name: String,
    pub structured_country: String,
    pub region: Option<String>,
    pub provinces: Vec<ProvinceRule>,
    pub city_bounds: Vec<CityBounds>,
    pub validator: ValidatorKind,
    pub use_secondary: bool,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            nominatim_url: "https://nominatim.openstreetmap.org/search".into(),
            photon_url: "https://photon.komoot.io/api/".into(),
            user_agent: format!("venue-geocoder/{}", env!("CARGO_PKG_VERSION")),
            contact_email: String::new(),
            accept_language: "es".into(),
            timeout_secs: 25,
            min_interval_ms: 1100,
            country_code: "es".into(),
            country_name: "España".into(),
            structured_country: "Spain".into(),
            region: Some("Comunitat Valenciana".into()),
            provinces: default_provinces(),
            city_bounds: default_city_bounds(),
            validator: ValidatorKind::Locality,
            use_secondary: true,
        }
    }
}

fn default_provinces() -> Vec<ProvinceRule> {
    let rule = |name: &str, keywords: &[&str]| ProvinceRule {
        name: name.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    };
    vec![
        rule("Valencia", &["valencia"]),
        rule("Alicante", &["alicante", "alacant"]),
        rule("Castellón", &["castellon", "castello"]),
    ]
}

fn default_city_bounds() -> Vec<CityBounds> {
    vec![
        CityBounds {
            name: "valencia".into(),
            aliases: vec![],
            lat_min: 39.405,
            lat_max: 39.563,
            lon_min: -0.431,
            lon_max: -0.260,
        },
        CityBounds {
            name: "alicante".into(),
            aliases: vec!["alacant".into()],
            lat_min: 38.332,
            lat_max: 38.407,
            lon_min: -0.563,
            lon_max: -0.435,
        },
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("no contact email configured: set contact_email in the config file or pass --contact-email")]
    MissingContact,
    #[error("invalid contact email '{0}'")]
    InvalidContact(String),
}

impl GeocoderConfig {
    /// Load from an explicit path, or from the default path when it exists,
    /// or fall back to built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".venue-geocoder")
            .join("config.json")
    }

    /// Geocoding services require a contact on every request; refuse to
    /// start without one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let email = self.contact_email.trim();
        if email.is_empty() {
            return Err(ConfigError::MissingContact);
        }
        match email.split_once('@') {
            Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(ConfigError::InvalidContact(email.to_string())),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Client identifier sent as `User-Agent`, with the contact when known.
    pub fn client_identifier(&self) -> String {
        if self.contact_email.is_empty() {
            self.user_agent.clone()
        } else {
            format!("{} (contact: {})", self.user_agent, self.contact_email)
        }
    }
}
