//! Text canonicalization and address clean-up.
//!
//! [`normalize`] produces the comparison form used for locality matching and
//! plausibility scoring. Queries sent to providers are built from the
//! original text, never from the normalized form.

use regex::Regex;
use std::sync::LazyLock;

static PARENTHETICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(([^)]*)\)\s*").expect("valid regex"));
static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));
static NOISE_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)·|\||\btel[eé]fono\b|\btelf\b\.?|\btel\b\.?").expect("valid regex")
});
static UNIT_NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(bajo|bloque|grupo|local|portal|piso|puerta)\b.*$").expect("valid regex")
});
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s]*\+?\b\d{3}[\s.]?\d{3}[\s.]?\d{3}\s*$").expect("valid regex"));
static CALLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bC/\s*").expect("valid regex"));
static AVENIDA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(avda|av)\b\.?").expect("valid regex"));
static PLAZA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpl\b\.?").expect("valid regex"));
static GENERIC_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(bar|cafeter[ií]a|bodega|mes[oó]n|restaurante)\s+").expect("valid regex")
});
static STREET_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?\D)[,\s]+(\d+[A-Za-z]?)\b[^\p{L}]*$").expect("valid regex"));

/// Map an accented Latin letter to its base letter. Input is already lowercase.
fn fold_diacritic(c: char) -> Option<char> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        _ => return None,
    };
    Some(folded)
}

/// Split `"Borbotó (Valencia)"` into `("Borbotó", Some("Valencia"))`.
///
/// Only the first parenthetical is returned; every parenthetical segment is
/// removed from the outer part.
pub fn split_parenthetical(s: &str) -> (String, Option<String>) {
    let inner = PARENTHETICAL_RE
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|inner| !inner.is_empty());
    let outer = collapse_whitespace(&PARENTHETICAL_RE.replace_all(s, " "));
    (outer, inner)
}

/// Canonical comparison form: lowercase, parentheticals removed, diacritics
/// folded, `/` and every other non-`[a-z0-9]` run collapsed to one space.
pub fn normalize(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    let without_parens = PARENTHETICAL_RE.replace_all(&lowered, " ");
    let folded: String = without_parens
        .chars()
        .map(|c| match c {
            '/' => ' ',
            c => fold_diacritic(c).unwrap_or(c),
        })
        .collect();
    NON_ALNUM_RE.replace_all(&folded, " ").trim().to_string()
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Treat spreadsheet placeholders as absent values.
pub fn sanitize_field(value: &str) -> &str {
    let v = value.trim();
    match v.to_ascii_lowercase().as_str() {
        "null" | "none" | "nan" => "",
        _ => v,
    }
}

/// Strip phone numbers and unit/floor noise, expand common street-type
/// abbreviations, and collapse whitespace.
pub fn clean_address(raw: &str) -> String {
    let a = sanitize_field(raw);
    if a.is_empty() {
        return String::new();
    }

    let a = NOISE_SEPARATOR_RE.split(a).next().unwrap_or_default().trim();
    let a = CALLE_RE.replace_all(a, "Calle ");
    let a = AVENIDA_RE.replace_all(&a, "Avenida");
    let a = PLAZA_RE.replace_all(&a, "Plaza");
    let a = UNIT_NOISE_RE.replace(&a, "");
    let a = PHONE_RE.replace(&a, "");

    collapse_whitespace(&a)
        .trim_matches(|c: char| c == ',' || c.is_whitespace())
        .to_string()
}

/// Drop a generic business-type prefix (`Bar`, `Restaurante`, ...) from a
/// venue name. Returns the name unchanged when there is none.
pub fn strip_generic_prefix(name: &str) -> String {
    GENERIC_PREFIX_RE.replace(name.trim(), "").trim().to_string()
}

/// Split `"Calle Sanahuja 53"` or `"Plaza Tetuán, 19"` into street and
/// house number. The house number is the first number after which only
/// numbers and punctuation follow, so floors and postcodes are not taken.
pub fn split_street_number(address: &str) -> Option<(String, String)> {
    let caps = STREET_NUMBER_RE.captures(address.trim())?;
    let street = caps[1]
        .trim_end_matches(|c: char| c == ',' || c.is_whitespace())
        .trim();
    if street.is_empty() {
        return None;
    }
    Some((street.to_string(), caps[2].to_string()))
}

/// Extract the `query` parameter of a map-search URL such as
/// `https://www.google.com/maps/search/?api=1&query=Bar+Pepe%2C+Valencia`.
pub fn map_search_query(url: &str) -> Option<String> {
    let (_, query_string) = url.trim().split_once('?')?;
    let query_string = query_string.split('#').next().unwrap_or_default();

    let raw = query_string
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "query")
        .map(|(_, value)| value)?;

    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).ok()?;
    let query = collapse_whitespace(&decoded);
    if query.is_empty() {
        None
    } else {
        Some(query)
    }
}
