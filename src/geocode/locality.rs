//! Locality derivation: outer name, parenthetical sub-locality, inferred
//! province, and the known-city bounding boxes.

use crate::config::{CityBounds, GeocoderConfig, ProvinceRule};
use crate::text::{normalize, split_parenthetical};

/// Where a venue is expected to be, derived from its free-text city field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locality {
    /// Outer name with parentheticals removed, original casing kept.
    pub base: String,
    pub parenthetical: Option<String>,
    /// Empty when no province keyword matched.
    pub province: String,
}

impl Locality {
    /// Query form: `"Borbotó (Valencia)"` becomes `"Borbotó, Valencia"` so the
    /// provincial anchor is kept.
    pub fn query_form(&self) -> String {
        match &self.parenthetical {
            Some(inner) if self.base.is_empty() => inner.clone(),
            Some(inner) if !self.base.to_lowercase().contains(&inner.to_lowercase()) => {
                format!("{}, {}", self.base, inner)
            }
            _ => self.base.clone(),
        }
    }

    /// Province suffix for a query, or `None` when the locality already
    /// names it (accents and case ignored).
    pub fn province_suffix(&self) -> Option<&str> {
        let province = normalize(&self.province);
        if province.is_empty() {
            return None;
        }
        if normalize(&self.query_form()).contains(&province) {
            None
        } else {
            Some(self.province.as_str())
        }
    }

    /// Normalized tokens a matching label should contain: the parenthetical
    /// and the outer name, each split further on `/`, `,` and `-`.
    pub fn match_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        let parts = self.parenthetical.iter().map(String::as_str).chain(std::iter::once(self.base.as_str()));
        for part in parts {
            for piece in part.split(['/', ',', '-']) {
                let token = normalize(piece);
                if !token.is_empty() && !tokens.contains(&token) {
                    tokens.push(token);
                }
            }
        }
        tokens
    }
}

/// Immutable lookup data for province inference and city bounds.
#[derive(Debug, Clone, Default)]
pub struct LocalityTable {
    provinces: Vec<ProvinceRule>,
    bounds: Vec<CityBounds>,
}

impl LocalityTable {
    pub fn new(provinces: Vec<ProvinceRule>, bounds: Vec<CityBounds>) -> Self {
        Self { provinces, bounds }
    }

    pub fn from_config(config: &GeocoderConfig) -> Self {
        Self::new(config.provinces.clone(), config.city_bounds.clone())
    }

    pub fn resolve(&self, city: &str) -> Locality {
        let (base, parenthetical) = split_parenthetical(city.trim());
        let haystack = format!(
            "{} {}",
            normalize(&base),
            parenthetical.as_deref().map(normalize).unwrap_or_default()
        );
        let province = self
            .provinces
            .iter()
            .find(|rule| {
                rule.keywords.iter().any(|k| {
                    let k = normalize(k);
                    !k.is_empty() && haystack.contains(&k)
                })
            })
            .map(|rule| rule.name.clone())
            .unwrap_or_default();

        Locality { base, parenthetical, province }
    }

    /// Bounding box of a known major city, matched on the outer name.
    pub fn bounds_for(&self, locality: &Locality) -> Option<&CityBounds> {
        let key = normalize(&locality.base);
        if key.is_empty() {
            return None;
        }
        self.bounds.iter().find(|b| {
            normalize(&b.name) == key || b.aliases.iter().any(|a| normalize(a) == key)
        })
    }
}
