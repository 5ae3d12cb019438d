//! Batch driver: venue CSV in, result CSVs and a run summary out.
//!
//! Venues are resolved one at a time and every row is flushed as soon as it
//! is written, so an interrupted run keeps what it already resolved.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::ConfigError;
use crate::geocode::{ResolutionResult, Status, StrategyTag, VenueInput, VenueResolver};
use crate::text::sanitize_field;

pub const OK_HEADER: [&str; 6] = ["venue_id", "lat", "lon", "provider", "label", "query_used"];
pub const REVIEW_HEADER: [&str; 11] = [
    "venue_id",
    "name",
    "city",
    "address_text",
    "google_maps_url",
    "query_used",
    "provider",
    "lat",
    "lon",
    "label",
    "reason",
];
pub const OK_MIN_HEADER: [&str; 3] = ["venue_id", "lat", "lon"];

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("{}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone)]
pub struct BatchPaths {
    pub input: PathBuf,
    pub out_ok: PathBuf,
    pub out_review: PathBuf,
    /// Reduced OK file with only id and coordinates.
    pub out_ok_min: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub input: String,
    pub total: usize,
    pub ok: usize,
    pub review: usize,
    pub miss: usize,
    /// Accepted hits per provider.
    pub by_provider: BTreeMap<String, usize>,
    /// Accepted hits per strategy tag.
    pub by_strategy: BTreeMap<StrategyTag, usize>,
}

impl RunSummary {
    fn new(input: &Path, total: usize) -> Self {
        Self {
            generated_at: Utc::now(),
            input: input.display().to_string(),
            total,
            ok: 0,
            review: 0,
            miss: 0,
            by_provider: BTreeMap::new(),
            by_strategy: BTreeMap::new(),
        }
    }

    fn record(&mut self, result: &ResolutionResult) {
        match result.status {
            Status::Ok => {
                self.ok += 1;
                if let Some(hit) = &result.hit {
                    *self.by_provider.entry(hit.provider.clone()).or_default() += 1;
                }
                *self.by_strategy.entry(result.strategy_used).or_default() += 1;
            }
            Status::Review => self.review += 1,
            Status::Miss => self.miss += 1,
        }
    }
}

// ─── Input ──────────────────────────────────────────────────────

/// Read venues from a headed CSV. Columns are found by name; missing
/// columns and null-like cells become empty strings.
pub fn read_venues(path: &Path) -> Result<Vec<VenueInput>, BatchError> {
    let file = File::open(path).map_err(|source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let csv_err = |source| BatchError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();
    let column = |names: &[&str]| names.iter().find_map(|n| headers.iter().position(|h| h == n));

    let id_col = column(&["venue_id", "id"]);
    let name_col = column(&["name"]);
    let city_col = column(&["city"]);
    let address_col = column(&["address_text", "address"]);
    let url_col = column(&["google_maps_url"]);

    let mut venues = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let field = |col: Option<usize>| {
            col.and_then(|i| record.get(i))
                .map(|v| sanitize_field(v).to_string())
                .unwrap_or_default()
        };
        venues.push(VenueInput {
            id: field(id_col),
            name: field(name_col),
            city: field(city_col),
            raw_address: field(address_col),
            map_search_url: field(url_col),
        });
    }
    Ok(venues)
}

// ─── Output ─────────────────────────────────────────────────────

struct Sink {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl Sink {
    fn create(path: &Path, header: &[&str]) -> Result<Self, BatchError> {
        let file = File::create(path).map_err(|source| BatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut sink = Self {
            path: path.to_path_buf(),
            writer: csv::WriterBuilder::new().from_writer(file),
        };
        sink.write(header)?;
        Ok(sink)
    }

    fn write<I>(&mut self, record: I) -> Result<(), BatchError>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        self.writer.write_record(record).map_err(|source| BatchError::Csv {
            path: self.path.clone(),
            source,
        })?;
        self.writer.flush().map_err(|source| BatchError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

struct Sinks {
    ok: Sink,
    review: Sink,
    ok_min: Option<Sink>,
}

impl Sinks {
    fn create(paths: &BatchPaths) -> Result<Self, BatchError> {
        Ok(Self {
            ok: Sink::create(&paths.out_ok, &OK_HEADER)?,
            review: Sink::create(&paths.out_review, &REVIEW_HEADER)?,
            ok_min: paths
                .out_ok_min
                .as_deref()
                .map(|p| Sink::create(p, &OK_MIN_HEADER))
                .transpose()?,
        })
    }

    /// OK goes to the OK sinks; REVIEW and MISS go to the review sink with
    /// the original input fields.
    fn write(&mut self, venue: &VenueInput, result: &ResolutionResult) -> Result<(), BatchError> {
        let (lat, lon, provider, label) = match &result.hit {
            Some(hit) => (hit.lat.to_string(), hit.lon.to_string(), hit.provider.as_str(), hit.label.as_str()),
            None => (String::new(), String::new(), "", ""),
        };

        if result.status == Status::Ok {
            self.ok.write([
                result.venue_id.as_str(),
                lat.as_str(),
                lon.as_str(),
                provider,
                label,
                result.query_used.as_str(),
            ])?;
            if let Some(min) = self.ok_min.as_mut() {
                min.write([result.venue_id.as_str(), lat.as_str(), lon.as_str()])?;
            }
            return Ok(());
        }

        let reason = result.reason.map(|r| r.as_str()).unwrap_or_default();
        self.review.write([
            result.venue_id.as_str(),
            venue.name.as_str(),
            venue.city.as_str(),
            venue.raw_address.as_str(),
            venue.map_search_url.as_str(),
            result.query_used.as_str(),
            provider,
            lat.as_str(),
            lon.as_str(),
            label,
            reason,
        ])
    }
}

// ─── Run ────────────────────────────────────────────────────────

pub fn run(resolver: &VenueResolver, paths: &BatchPaths) -> Result<RunSummary, BatchError> {
    let venues = read_venues(&paths.input)?;
    let mut sinks = Sinks::create(paths)?;
    let mut summary = RunSummary::new(&paths.input, venues.len());
    info!(input = %paths.input.display(), venues = venues.len(), "starting batch");

    let total = venues.len();
    for (i, venue) in venues.iter().enumerate() {
        let result = resolver.resolve(venue);
        let found = match &result.hit {
            Some(hit) => format!(" {:.6},{:.6} via {}", hit.lat, hit.lon, hit.provider),
            None => String::new(),
        };
        let reason = result.reason.map(|r| format!(" [{r}]")).unwrap_or_default();
        info!(
            "[{}/{}] {} | {} -> {} ({}){}{}",
            i + 1,
            total,
            venue.id,
            venue.name,
            result.status,
            result.strategy_used,
            found,
            reason
        );
        sinks.write(venue, &result)?;
        summary.record(&result);
    }

    info!(
        ok = summary.ok,
        review = summary.review,
        miss = summary.miss,
        ok_file = %paths.out_ok.display(),
        review_file = %paths.out_review.display(),
        "batch complete"
    );
    Ok(summary)
}
