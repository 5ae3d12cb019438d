//! Query strategy generation, highest precision first.
//!
//! ADDR → STRUCT → GMAPS → FULL → ALT → NAME_CITY. Each strategy is emitted
//! only when its inputs are present; NAME_CITY is always emitted so the list
//! is never empty, with blank text when the venue has no name.

use super::locality::Locality;
use super::types::{Query, Strategy, StrategyTag, VenueInput};
use crate::config::GeocoderConfig;
use crate::text::{clean_address, map_search_query, split_street_number, strip_generic_prefix};

/// Builds the ordered candidate queries for one venue.
#[derive(Debug, Clone)]
pub struct StrategyGenerator {
    country_name: String,
    region: Option<String>,
}

impl StrategyGenerator {
    pub fn new(country_name: impl Into<String>, region: Option<String>) -> Self {
        Self {
            country_name: country_name.into(),
            region: region.filter(|r| !r.trim().is_empty()),
        }
    }

    pub fn from_config(config: &GeocoderConfig) -> Self {
        Self::new(config.country_name.clone(), config.region.clone())
    }

    pub fn generate(&self, venue: &VenueInput, locality: &Locality) -> Vec<Strategy> {
        let name = venue.name.trim();
        let address = clean_address(&venue.raw_address);
        let place = locality.query_form();
        let province = locality.province_suffix().unwrap_or_default();
        let country = self.country_name.as_str();
        let region = self.region.as_deref().unwrap_or_default();

        let mut strategies = Vec::new();

        if !address.is_empty() {
            strategies.push(Strategy::freeform(
                StrategyTag::Addr,
                join_parts([address.as_str(), place.as_str(), province, country]),
            ));

            if let Some((street, house_number)) = split_street_number(&address) {
                let city = if locality.base.is_empty() { place.clone() } else { locality.base.clone() };
                strategies.push(Strategy {
                    tag: StrategyTag::Struct,
                    query: Query::Structured { street, house_number, city },
                });
            }
        }

        if let Some(q) = map_search_query(&venue.map_search_url) {
            strategies.push(Strategy { tag: StrategyTag::Gmaps, query: Query::Raw(q) });
        }

        if !name.is_empty() {
            strategies.push(Strategy::freeform(
                StrategyTag::Full,
                join_parts([name, address.as_str(), place.as_str(), province, region, country]),
            ));

            let alt = strip_generic_prefix(name);
            if !alt.is_empty() && alt.to_lowercase() != name.to_lowercase() {
                strategies.push(Strategy::freeform(
                    StrategyTag::Alt,
                    join_parts([alt.as_str(), address.as_str(), place.as_str(), province, region, country]),
                ));
            }
        }

        // A bare locality would geocode to the city or country centroid.
        let name_city = if name.is_empty() {
            String::new()
        } else {
            join_parts([name, place.as_str(), province, country])
        };
        strategies.push(Strategy::freeform(StrategyTag::NameCity, name_city));

        strategies
    }
}

fn join_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::locality::LocalityTable;
    use crate::geocode::types::StrategyKind;

    fn generate(venue: &VenueInput) -> Vec<Strategy> {
        let cfg = GeocoderConfig::default();
        let locality = LocalityTable::from_config(&cfg).resolve(&venue.city);
        StrategyGenerator::from_config(&cfg).generate(venue, &locality)
    }

    fn tags(strategies: &[Strategy]) -> Vec<StrategyTag> {
        strategies.iter().map(|s| s.tag).collect()
    }

    fn venue(name: &str, city: &str, address: &str, url: &str) -> VenueInput {
        VenueInput {
            id: "v1".into(),
            name: name.into(),
            city: city.into(),
            raw_address: address.into(),
            map_search_url: url.into(),
        }
    }

    #[test]
    fn test_full_order_with_address() {
        let v = venue("Bar Els Arcs", "Valencia", "Carrer Sant Vicent 10", "");
        let s = generate(&v);
        assert_eq!(
            tags(&s),
            vec![StrategyTag::Addr, StrategyTag::Struct, StrategyTag::Full, StrategyTag::Alt, StrategyTag::NameCity]
        );
        assert_eq!(s[0].text(), Some("Carrer Sant Vicent 10, Valencia, España"));
        assert_eq!(
            s[1].query,
            Query::Structured {
                street: "Carrer Sant Vicent".into(),
                house_number: "10".into(),
                city: "Valencia".into(),
            }
        );
        assert_eq!(
            s[2].text(),
            Some("Bar Els Arcs, Carrer Sant Vicent 10, Valencia, Comunitat Valenciana, España")
        );
        assert_eq!(
            s[3].text(),
            Some("Els Arcs, Carrer Sant Vicent 10, Valencia, Comunitat Valenciana, España")
        );
        assert_eq!(s[4].text(), Some("Bar Els Arcs, Valencia, España"));
    }

    #[test]
    fn test_gmaps_after_struct() {
        let v = venue(
            "Casa Toni",
            "Valencia",
            "Calle Mayor 4",
            "https://www.google.com/maps/search/?api=1&query=Casa+Toni+Valencia",
        );
        let s = generate(&v);
        assert_eq!(
            tags(&s),
            vec![StrategyTag::Addr, StrategyTag::Struct, StrategyTag::Gmaps, StrategyTag::Full, StrategyTag::NameCity]
        );
        assert_eq!(s[2].kind(), StrategyKind::RawQuery);
        assert_eq!(s[2].text(), Some("Casa Toni Valencia"));
    }

    #[test]
    fn test_no_address_no_url() {
        let v = venue("Restaurante Casa Pepe", "Alicante", "", "");
        let s = generate(&v);
        assert_eq!(tags(&s), vec![StrategyTag::Full, StrategyTag::Alt, StrategyTag::NameCity]);
        assert_eq!(s[1].text(), Some("Casa Pepe, Alicante, Comunitat Valenciana, España"));
        assert!(s.iter().all(|st| !matches!(st.tag, StrategyTag::Addr | StrategyTag::Struct | StrategyTag::Gmaps)));
    }

    #[test]
    fn test_no_alt_when_prefix_absent() {
        let v = venue("Casa Pepe", "Alicante", "", "");
        assert_eq!(tags(&generate(&v)), vec![StrategyTag::Full, StrategyTag::NameCity]);
    }

    #[test]
    fn test_address_without_number_skips_struct() {
        let v = venue("Casa Pepe", "Alicante", "Plaza del Mercado", "");
        assert_eq!(
            tags(&generate(&v)),
            vec![StrategyTag::Addr, StrategyTag::Full, StrategyTag::NameCity]
        );
    }

    #[test]
    fn test_province_suffix_added_when_not_implied() {
        let v = venue("Casa Pepe", "Borbotó (Valencia)", "", "");
        let s = generate(&v);
        assert_eq!(s.last().unwrap().text(), Some("Casa Pepe, Borbotó, Valencia, España"));

        let v = venue("Casa Pepe", "Alacant", "Calle Mayor", "");
        let s = generate(&v);
        assert_eq!(s[0].text(), Some("Calle Mayor, Alacant, Alicante, España"));
    }

    #[test]
    fn test_never_empty() {
        let s = generate(&VenueInput::default());
        assert_eq!(tags(&s), vec![StrategyTag::NameCity]);
        assert_eq!(s[0].text(), Some(""));
    }

    #[test]
    fn test_nameless_venue_gets_blank_name_city() {
        let v = venue("", "Valencia", "Carrer Sant Vicent 10", "");
        let s = generate(&v);
        assert_eq!(tags(&s), vec![StrategyTag::Addr, StrategyTag::Struct, StrategyTag::NameCity]);
        assert_eq!(s[2].text(), Some(""));
    }

    #[test]
    fn test_address_cleaned_before_query() {
        let v = venue("Casa Pepe", "Valencia", "C/ Sueca 12, bajo · Tel 963000000", "");
        let s = generate(&v);
        assert_eq!(s[0].text(), Some("Calle Sueca 12, Valencia, España"));
        assert!(matches!(
            &s[1].query,
            Query::Structured { street, house_number, .. } if street == "Calle Sueca" && house_number == "12"
        ));
    }
}
