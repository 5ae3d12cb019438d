//! Plausibility checks on a provider hit.
//!
//! Label check first, then the bounding box of a known city. A label
//! mismatch wins when both fail.

use super::locality::{Locality, LocalityTable};
use super::types::{Hit, Reason, ValidatorKind, Verdict, VenueInput};
use crate::text::normalize;

/// Name tokens that say nothing about which venue a label refers to.
const NAME_STOPWORDS: &[&str] = &[
    "bar", "restaurante", "restaurant", "cafeteria", "cafe", "grupo", "el", "la", "los", "las", "de", "del", "i",
];

/// Shortest name token that counts towards a name match.
const MIN_NAME_TOKEN_LEN: usize = 4;

#[derive(Debug, Clone)]
pub struct Validator {
    kind: ValidatorKind,
    table: LocalityTable,
}

impl Validator {
    pub fn new(kind: ValidatorKind, table: LocalityTable) -> Self {
        Self { kind, table }
    }

    pub fn validate(&self, venue: &VenueInput, locality: &Locality, hit: &Hit) -> Verdict {
        let label_ok = match self.kind {
            ValidatorKind::Locality => label_matches_locality(locality, &hit.label),
            ValidatorKind::NameTokens => label_matches_name(&venue.name, &hit.label),
        };
        if !label_ok {
            return Verdict::Rejected(match self.kind {
                ValidatorKind::Locality => Reason::LabelMismatchCity,
                ValidatorKind::NameTokens => Reason::LabelMismatchName,
            });
        }

        match self.table.bounds_for(locality) {
            Some(bounds) if !bounds.contains(hit.lat, hit.lon) => Verdict::Rejected(Reason::BboxOutsideCity),
            _ => Verdict::Accepted,
        }
    }
}

/// Lenient: an empty label, or a locality with nothing to match, passes.
fn label_matches_locality(locality: &Locality, label: &str) -> bool {
    let label = normalize(label);
    if label.is_empty() {
        return true;
    }
    let tokens = locality.match_tokens();
    if tokens.is_empty() {
        return true;
    }
    if tokens.iter().any(|t| label.contains(t.as_str())) {
        return true;
    }
    let province = normalize(&locality.province);
    !province.is_empty() && label.contains(&province)
}

/// Strict: short names need one distinctive token in the label, longer
/// names need two.
fn label_matches_name(name: &str, label: &str) -> bool {
    let name = normalize(name);
    let label = normalize(label);
    if name.is_empty() || label.is_empty() {
        return false;
    }

    let tokens: Vec<&str> = name.split_whitespace().filter(|t| !NAME_STOPWORDS.contains(t)).collect();
    if tokens.is_empty() {
        return false;
    }
    let hits = tokens
        .iter()
        .filter(|t| t.len() >= MIN_NAME_TOKEN_LEN && label.contains(**t))
        .count();

    let required = if tokens.len() <= 2 { 1 } else { 2 };
    hits >= required
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeocoderConfig;

    fn validator(kind: ValidatorKind) -> (Validator, LocalityTable) {
        let table = LocalityTable::from_config(&GeocoderConfig::default());
        (Validator::new(kind, table.clone()), table)
    }

    fn hit(lat: f64, lon: f64, label: &str) -> Hit {
        Hit {
            lat,
            lon,
            label: label.into(),
            provider: "nominatim".into(),
        }
    }

    fn venue(name: &str, city: &str) -> VenueInput {
        VenueInput {
            id: "v".into(),
            name: name.into(),
            city: city.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_accepts_label_with_locality_inside_bounds() {
        let (v, table) = validator(ValidatorKind::Locality);
        let venue = venue("Bar Els Arcs", "Valencia");
        let loc = table.resolve(&venue.city);
        let h = hit(39.4702, -0.3768, "Carrer de Sant Vicent Màrtir, 10, Ciutat Vella, València, España");
        assert_eq!(v.validate(&venue, &loc, &h), Verdict::Accepted);
    }

    #[test]
    fn test_label_mismatch_city() {
        let (v, table) = validator(ValidatorKind::Locality);
        let venue = venue("Casa Pepe", "Alicante");
        let loc = table.resolve(&venue.city);
        let h = hit(38.3452, -0.4810, "Calle Mayor, Murcia, España");
        assert_eq!(v.validate(&venue, &loc, &h), Verdict::Rejected(Reason::LabelMismatchCity));
    }

    #[test]
    fn test_bbox_outside_city() {
        let (v, table) = validator(ValidatorKind::Locality);
        let venue = venue("Casa Pepe", "Valencia");
        let loc = table.resolve(&venue.city);
        let h = hit(39.60, -0.50, "Carrer Major, Valencia, España");
        assert_eq!(v.validate(&venue, &loc, &h), Verdict::Rejected(Reason::BboxOutsideCity));
    }

    #[test]
    fn test_label_mismatch_takes_precedence_over_bbox() {
        let (v, table) = validator(ValidatorKind::Locality);
        let venue = venue("Casa Pepe", "Valencia");
        let loc = table.resolve(&venue.city);
        let h = hit(40.41, -3.70, "Calle Mayor, Madrid, España");
        assert_eq!(v.validate(&venue, &loc, &h), Verdict::Rejected(Reason::LabelMismatchCity));
    }

    #[test]
    fn test_parenthetical_or_province_is_enough() {
        let (v, table) = validator(ValidatorKind::Locality);
        let venue = venue("Casa Pepe", "Borbotó (Valencia)");
        let loc = table.resolve(&venue.city);
        let h = hit(39.51, -0.39, "Alqueria, Valencia, Comunitat Valenciana, España");
        assert_eq!(v.validate(&venue, &loc, &h), Verdict::Accepted);
    }

    #[test]
    fn test_lenient_edges() {
        let (v, table) = validator(ValidatorKind::Locality);
        let venue = venue("Casa Pepe", "Valencia");
        let loc = table.resolve(&venue.city);
        assert_eq!(v.validate(&venue, &loc, &hit(39.47, -0.37, "")), Verdict::Accepted);

        let anywhere = table.resolve("");
        assert_eq!(v.validate(&venue, &anywhere, &hit(43.0, -8.0, "Santiago, Galicia")), Verdict::Accepted);
    }

    #[test]
    fn test_unregistered_city_skips_bbox() {
        let (v, table) = validator(ValidatorKind::Locality);
        let venue = venue("Casa Pepe", "Gandia");
        let loc = table.resolve(&venue.city);
        assert_eq!(v.validate(&venue, &loc, &hit(38.97, -0.18, "Passeig, Gandia, Safor")), Verdict::Accepted);
    }

    #[test]
    fn test_name_tokens() {
        assert!(label_matches_name("Bar Els Arcs", "Bar Els Arcs, Carrer Sant Vicent, València"));
        assert!(!label_matches_name("Bar Els Arcs", "Poliesportiu Municipal, València"));
        assert!(label_matches_name("Restaurante Casa Pepica Marina", "La Pepica Marina, Passeig de Neptú"));
        assert!(!label_matches_name("Restaurante Casa Pepica Marina", "Pepica, Passeig de Neptú"));
        assert!(!label_matches_name("", "anything"));
        assert!(!label_matches_name("Casa Pepe", ""));
        assert!(!label_matches_name("Bar de la", "Bar de la Plaza"));
    }

    #[test]
    fn test_name_validator_still_checks_bbox() {
        let (v, table) = validator(ValidatorKind::NameTokens);
        let venue = venue("Bar Els Arcs", "Valencia");
        let loc = table.resolve(&venue.city);

        let outside = hit(39.60, -0.50, "Els Arcs, Bétera");
        assert_eq!(v.validate(&venue, &loc, &outside), Verdict::Rejected(Reason::BboxOutsideCity));

        let wrong = hit(39.47, -0.37, "Polideportivo, València");
        assert_eq!(v.validate(&venue, &loc, &wrong), Verdict::Rejected(Reason::LabelMismatchName));
    }
}
