//! Core types for the address resolution engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One venue record as supplied by the caller. Absent values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueInput {
    pub id: String,
    pub name: String,
    pub city: String,
    pub raw_address: String,
    pub map_search_url: String,
}

/// Stable label of a strategy, used for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyTag {
    Addr,
    Struct,
    Gmaps,
    Full,
    Alt,
    NameCity,
}

impl StrategyTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Addr => "ADDR",
            Self::Struct => "STRUCT",
            Self::Gmaps => "GMAPS",
            Self::Full => "FULL",
            Self::Alt => "ALT",
            Self::NameCity => "NAME_CITY",
        }
    }
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Freeform,
    Structured,
    RawQuery,
}

/// What a strategy sends to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Freeform(String),
    Structured {
        street: String,
        house_number: String,
        city: String,
    },
    /// Human-authored text taken verbatim from a map-search URL.
    Raw(String),
}

/// One member of the ordered candidate list for a venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub tag: StrategyTag,
    pub query: Query,
}

impl Strategy {
    pub fn freeform(tag: StrategyTag, text: impl Into<String>) -> Self {
        Self { tag, query: Query::Freeform(text.into()) }
    }

    pub fn kind(&self) -> StrategyKind {
        match self.query {
            Query::Freeform(_) => StrategyKind::Freeform,
            Query::Structured { .. } => StrategyKind::Structured,
            Query::Raw(_) => StrategyKind::RawQuery,
        }
    }

    /// Single-line text for free-form providers; `None` for structured queries.
    pub fn text(&self) -> Option<&str> {
        match &self.query {
            Query::Freeform(t) | Query::Raw(t) => Some(t.as_str()),
            Query::Structured { .. } => None,
        }
    }

    /// Audit form written to the `query_used` column.
    pub fn describe(&self) -> String {
        match &self.query {
            Query::Freeform(t) | Query::Raw(t) => format!("{}:{}", self.tag, t),
            Query::Structured { street, house_number, city } => {
                format!("{}:{} {} | city={}", self.tag, street, house_number, city)
            }
        }
    }
}

/// Result of one successful provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub lat: f64,
    pub lon: f64,
    pub label: String,
    pub provider: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Review,
    Miss,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Review => write!(f, "REVIEW"),
            Self::Miss => write!(f, "MISS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    NoResult,
    LabelMismatchCity,
    LabelMismatchName,
    BboxOutsideCity,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoResult => "no_result",
            Self::LabelMismatchCity => "label_mismatch_city",
            Self::LabelMismatchName => "label_mismatch_name",
            Self::BboxOutsideCity => "bbox_outside_city",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plausibility outcome for one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Reason),
}

/// Which label heuristic the validator applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    /// Expected locality tokens (or province) must appear in the label.
    #[default]
    Locality,
    /// Distinctive venue-name tokens must appear in the label.
    NameTokens,
}

/// Terminal outcome for one venue.
///
/// `hit` is present iff `status` is `Ok` or `Review`; `reason` is present iff
/// `status` is `Review` or `Miss`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    pub venue_id: String,
    pub status: Status,
    pub hit: Option<Hit>,
    pub strategy_used: StrategyTag,
    pub query_used: String,
    pub reason: Option<Reason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    RateLimited,
    Forbidden,
    Transport,
    Malformed,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limited"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::Transport => write!(f, "transport"),
            Self::Malformed => write!(f, "malformed response"),
        }
    }
}

/// A provider call that failed for a reason other than "no match".
#[derive(Debug, Clone, thiserror::Error)]
#[error("{provider}: {kind}: {detail}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
    pub detail: String,
}

impl ProviderError {
    pub fn new(provider: &str, kind: ProviderErrorKind, detail: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            kind,
            detail: detail.into(),
        }
    }
}
