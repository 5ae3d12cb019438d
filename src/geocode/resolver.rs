//! Venue resolver: runs the strategy cascade across providers.
//!
//! Structured strategies go to the structured provider only; free-form and
//! raw strategies try the primary provider, then the secondary. Provider
//! errors are logged and treated as "no result". The first hit ends the
//! search and is then validated and classified.

use tracing::{debug, warn};

use super::classifier::{classify, SearchOutcome};
use super::locality::LocalityTable;
use super::providers::{HttpClient, NominatimBackend, NominatimSearch, NominatimStructured, Photon, Provider, SearchContext};
use super::strategy::StrategyGenerator;
use super::types::{Hit, ResolutionResult, Strategy, StrategyKind, StrategyTag, VenueInput};
use super::validator::Validator;
use crate::config::GeocoderConfig;

pub struct VenueResolver {
    table: LocalityTable,
    strategies: StrategyGenerator,
    primary: Box<dyn Provider>,
    structured: Box<dyn Provider>,
    secondary: Option<Box<dyn Provider>>,
    validator: Validator,
}

impl VenueResolver {
    pub fn new(
        table: LocalityTable,
        strategies: StrategyGenerator,
        primary: Box<dyn Provider>,
        structured: Box<dyn Provider>,
        secondary: Option<Box<dyn Provider>>,
        validator: Validator,
    ) -> Self {
        Self {
            table,
            strategies,
            primary,
            structured,
            secondary,
            validator,
        }
    }

    /// Nominatim (free-form and structured, one shared rate gate) with
    /// Photon as the optional secondary.
    pub fn from_config(config: &GeocoderConfig) -> Self {
        let http = HttpClient::from_config(config);
        let backend = NominatimBackend::from_config(http.clone(), config);
        let secondary: Option<Box<dyn Provider>> = if config.use_secondary {
            Some(Box::new(Photon::new(http, config.photon_url.clone())))
        } else {
            None
        };
        let table = LocalityTable::from_config(config);

        Self::new(
            table.clone(),
            StrategyGenerator::from_config(config),
            Box::new(NominatimSearch::new(backend.clone())),
            Box::new(NominatimStructured::new(backend, config.structured_country.clone())),
            secondary,
            Validator::new(config.validator, table),
        )
    }

    pub fn resolve(&self, venue: &VenueInput) -> ResolutionResult {
        let locality = self.table.resolve(&venue.city);
        let ctx = SearchContext {
            bounds: self.table.bounds_for(&locality),
        };
        let strategies = self.strategies.generate(venue, &locality);

        let outcome = match self.search(&venue.id, strategies, &ctx) {
            (strategy, Some(hit)) => {
                let verdict = self.validator.validate(venue, &locality, &hit);
                SearchOutcome::Found { strategy, hit, verdict }
            }
            (last, None) => SearchOutcome::Exhausted { last },
        };
        classify(&venue.id, outcome)
    }

    /// Returns the strategy that produced the first hit, or the last
    /// strategy tried when nothing was found.
    fn search(&self, venue_id: &str, strategies: Vec<Strategy>, ctx: &SearchContext<'_>) -> (Strategy, Option<Hit>) {
        let mut last = Strategy::freeform(StrategyTag::NameCity, "");
        for strategy in strategies {
            if strategy.text().is_some_and(|t| t.trim().is_empty()) {
                debug!(venue = venue_id, tag = %strategy.tag, "blank query, skipped");
                last = strategy;
                continue;
            }
            for provider in self.providers_for(&strategy) {
                match provider.search(&strategy, ctx) {
                    Ok(Some(hit)) => {
                        debug!(venue = venue_id, provider = provider.name(), query = %strategy.describe(), "hit");
                        return (strategy, Some(hit));
                    }
                    Ok(None) => {
                        debug!(venue = venue_id, provider = provider.name(), query = %strategy.describe(), "no result");
                    }
                    Err(e) => {
                        warn!(venue = venue_id, tag = %strategy.tag, "{e}");
                    }
                }
            }
            last = strategy;
        }
        (last, None)
    }

    fn providers_for(&self, strategy: &Strategy) -> Vec<&dyn Provider> {
        match strategy.kind() {
            StrategyKind::Structured => vec![self.structured.as_ref()],
            StrategyKind::Freeform | StrategyKind::RawQuery => std::iter::once(self.primary.as_ref())
                .chain(self.secondary.as_deref())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::types::{ProviderError, ProviderErrorKind, Reason, Status, ValidatorKind};
    use std::cell::RefCell;
    use std::rc::Rc;

    type CallLog = Rc<RefCell<Vec<String>>>;
    type Reply = Result<Option<Hit>, ProviderError>;

    /// Provider that answers from a fixed script keyed by strategy tag and
    /// records every call.
    struct Scripted {
        name: &'static str,
        replies: Vec<(StrategyTag, Reply)>,
        log: CallLog,
    }

    impl Provider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn search(&self, strategy: &Strategy, _ctx: &SearchContext<'_>) -> Reply {
            self.log.borrow_mut().push(format!("{}:{}", self.name, strategy.tag));
            self.replies
                .iter()
                .find(|(tag, _)| *tag == strategy.tag)
                .map(|(_, reply)| reply.clone())
                .unwrap_or(Ok(None))
        }
    }

    fn hit(provider: &str, lat: f64, lon: f64, label: &str) -> Reply {
        Ok(Some(Hit {
            lat,
            lon,
            label: label.into(),
            provider: provider.into(),
        }))
    }

    struct Harness {
        resolver: VenueResolver,
        log: CallLog,
    }

    fn harness(
        primary: Vec<(StrategyTag, Reply)>,
        structured: Vec<(StrategyTag, Reply)>,
        secondary: Option<Vec<(StrategyTag, Reply)>>,
    ) -> Harness {
        let cfg = GeocoderConfig::default();
        let table = LocalityTable::from_config(&cfg);
        let log = CallLog::default();
        let scripted = |name: &'static str, replies: Vec<(StrategyTag, Reply)>| -> Box<dyn Provider> {
            Box::new(Scripted { name, replies, log: log.clone() })
        };
        let resolver = VenueResolver::new(
            table.clone(),
            StrategyGenerator::from_config(&cfg),
            scripted("nominatim", primary),
            scripted("nominatim_struct", structured),
            secondary.map(|replies| scripted("photon", replies)),
            Validator::new(ValidatorKind::Locality, table),
        );
        Harness { resolver, log }
    }

    fn venue(name: &str, city: &str, address: &str) -> VenueInput {
        VenueInput {
            id: "v1".into(),
            name: name.into(),
            city: city.into(),
            raw_address: address.into(),
            map_search_url: String::new(),
        }
    }

    fn calls(h: &Harness) -> Vec<String> {
        h.log.borrow().clone()
    }

    #[test]
    fn test_first_address_hit_is_ok() {
        let h = harness(
            vec![(StrategyTag::Addr, hit("nominatim", 39.4702, -0.3768, "Carrer Sant Vicent, València, España"))],
            vec![],
            Some(vec![]),
        );
        let r = h.resolver.resolve(&venue("Bar Els Arcs", "Valencia", "Carrer Sant Vicent 10"));

        assert_eq!(r.status, Status::Ok);
        assert_eq!(r.strategy_used, StrategyTag::Addr);
        assert_eq!(r.query_used, "ADDR:Carrer Sant Vicent 10, Valencia, España");
        assert_eq!(r.reason, None);
        assert_eq!(r.hit.unwrap().provider, "nominatim");
        assert_eq!(calls(&h), vec!["nominatim:ADDR"]);
    }

    #[test]
    fn test_wrong_city_label_is_review() {
        let h = harness(
            vec![(StrategyTag::Full, hit("nominatim", 38.35, -0.48, "Calle Mayor, Murcia, España"))],
            vec![],
            Some(vec![]),
        );
        let r = h.resolver.resolve(&venue("Casa Pepe", "Alicante", ""));

        assert_eq!(r.status, Status::Review);
        assert_eq!(r.reason, Some(Reason::LabelMismatchCity));
        assert_eq!(r.strategy_used, StrategyTag::Full);
        assert!(r.hit.is_some());
    }

    #[test]
    fn test_address_hit_in_other_city_is_review() {
        let h = harness(
            vec![(StrategyTag::Addr, hit("nominatim", 41.0, 2.0, "Sant Vicent, Barcelona, España"))],
            vec![],
            Some(vec![]),
        );
        let r = h.resolver.resolve(&venue("Bar Els Arcs", "Valencia", "Carrer Sant Vicent 10"));
        assert_eq!(r.status, Status::Review);
        assert_eq!(r.reason, Some(Reason::LabelMismatchCity));
        assert_eq!(r.strategy_used, StrategyTag::Addr);
    }

    #[test]
    fn test_hit_outside_city_box_is_review() {
        let h = harness(
            vec![(StrategyTag::Addr, hit("nominatim", 39.60, -0.50, "Carrer Major, Valencia, España"))],
            vec![],
            None,
        );
        let r = h.resolver.resolve(&venue("Casa Pepe", "Valencia", "Carrer Major"));
        assert_eq!(r.status, Status::Review);
        assert_eq!(r.reason, Some(Reason::BboxOutsideCity));
    }

    #[test]
    fn test_nothing_found_is_miss_on_last_strategy() {
        let h = harness(vec![], vec![], Some(vec![]));
        let r = h.resolver.resolve(&venue("Casa Pepe", "Alicante", ""));

        assert_eq!(r.status, Status::Miss);
        assert_eq!(r.reason, Some(Reason::NoResult));
        assert_eq!(r.strategy_used, StrategyTag::NameCity);
        assert_eq!(r.query_used, "NAME_CITY:Casa Pepe, Alicante, España");
        assert!(r.hit.is_none());
        assert_eq!(
            calls(&h),
            vec!["nominatim:FULL", "photon:FULL", "nominatim:NAME_CITY", "photon:NAME_CITY"]
        );
    }

    #[test]
    fn test_structured_goes_to_structured_provider_only() {
        let h = harness(vec![], vec![], Some(vec![]));
        h.resolver.resolve(&venue("Casa Pepe", "Valencia", "Calle Mayor 4"));

        let log = calls(&h);
        assert_eq!(&log[..3], &["nominatim:ADDR", "photon:ADDR", "nominatim_struct:STRUCT"]);
        assert!(!log.iter().any(|c| c == "photon:STRUCT" || c == "nominatim:STRUCT"));
    }

    #[test]
    fn test_primary_error_falls_back_to_secondary() {
        let rate_limited = Err(ProviderError::new("nominatim", ProviderErrorKind::RateLimited, "HTTP 429"));
        let h = harness(
            vec![(StrategyTag::Addr, rate_limited)],
            vec![],
            Some(vec![(StrategyTag::Addr, hit("photon", 39.47, -0.37, "Calle Mayor 4, Valencia"))]),
        );
        let r = h.resolver.resolve(&venue("Casa Pepe", "Valencia", "Calle Mayor 4"));

        assert_eq!(r.status, Status::Ok);
        assert_eq!(r.hit.unwrap().provider, "photon");
        assert_eq!(calls(&h), vec!["nominatim:ADDR", "photon:ADDR"]);
    }

    #[test]
    fn test_errors_everywhere_still_terminate_as_miss() {
        let err = |p: &str| Err(ProviderError::new(p, ProviderErrorKind::Transport, "timed out"));
        let h = harness(
            vec![(StrategyTag::Full, err("nominatim")), (StrategyTag::NameCity, err("nominatim"))],
            vec![],
            None,
        );
        let r = h.resolver.resolve(&venue("Casa Pepe", "Alicante", ""));
        assert_eq!(r.status, Status::Miss);
        assert_eq!(calls(&h), vec!["nominatim:FULL", "nominatim:NAME_CITY"]);
    }

    #[test]
    fn test_nameless_venue_never_queries_bare_locality() {
        let everywhere = |p: &str| {
            [StrategyTag::Addr, StrategyTag::Struct, StrategyTag::Gmaps, StrategyTag::Full, StrategyTag::NameCity]
                .into_iter()
                .map(|tag| (tag, hit(p, 39.47, -0.37, "València, España")))
                .collect::<Vec<_>>()
        };
        let h = harness(everywhere("nominatim"), everywhere("nominatim_struct"), Some(everywhere("photon")));

        let r = h.resolver.resolve(&venue("", "Valencia", ""));
        assert_eq!(r.status, Status::Miss);
        assert_eq!(r.reason, Some(Reason::NoResult));
        assert_eq!(r.strategy_used, StrategyTag::NameCity);
        assert!(r.hit.is_none());

        let r = h.resolver.resolve(&venue("", "", ""));
        assert_eq!(r.status, Status::Miss);
        assert!(calls(&h).is_empty());
    }

    #[test]
    fn test_map_query_tries_primary_then_secondary() {
        let h = harness(
            vec![],
            vec![],
            Some(vec![(StrategyTag::Gmaps, hit("photon", 39.47, -0.37, "Casa Toni, Valencia"))]),
        );
        let mut v = venue("Casa Toni", "Valencia", "");
        v.map_search_url = "https://www.google.com/maps/search/?api=1&query=Casa+Toni+Valencia".into();
        let r = h.resolver.resolve(&v);

        assert_eq!(r.status, Status::Ok);
        assert_eq!(r.strategy_used, StrategyTag::Gmaps);
        assert_eq!(r.query_used, "GMAPS:Casa Toni Valencia");
        assert_eq!(r.hit.unwrap().provider, "photon");
        assert_eq!(calls(&h), vec!["nominatim:GMAPS", "photon:GMAPS"]);
    }

    #[test]
    fn test_structured_hit_stops_cascade() {
        let h = harness(
            vec![],
            vec![(StrategyTag::Struct, hit("nominatim_struct", 39.47, -0.37, "Calle Mayor, 4, València"))],
            Some(vec![]),
        );
        let r = h.resolver.resolve(&venue("Casa Pepe", "Valencia", "Calle Mayor 4"));

        assert_eq!(r.status, Status::Ok);
        assert_eq!(r.strategy_used, StrategyTag::Struct);
        assert_eq!(r.query_used, "STRUCT:Calle Mayor 4 | city=Valencia");
        assert_eq!(calls(&h).last().map(String::as_str), Some("nominatim_struct:STRUCT"));
    }
}
