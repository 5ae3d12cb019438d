use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use venue_geocoder::batch::{self, BatchError, BatchPaths, RunSummary};
use venue_geocoder::config::GeocoderConfig;
use venue_geocoder::geocode::{ValidatorKind, VenueResolver};

/// Venue geocoder: resolves venue addresses to coordinates.
///
/// Reads a venue CSV, tries ordered query strategies against Nominatim
/// (and Photon as fallback), checks each hit for plausibility, and writes
/// accepted coordinates and a review list.
///
/// Examples:
///   venue-geocode --contact-email ops@example.org
///   venue-geocode --input venues.csv --out-ok-min coords.csv
///   venue-geocode --sleep 1.5 --validator name-tokens --no-secondary
#[derive(Parser)]
#[command(name = "venue-geocode", version, about, long_about = None)]
struct Cli {
    /// Input CSV (venue_id, name, city, address_text, google_maps_url).
    #[arg(long, default_value = "venues_need_coords.csv")]
    input: PathBuf,

    /// Accepted coordinates.
    #[arg(long, default_value = "venue_coords_OK.csv")]
    out_ok: PathBuf,

    /// Venues needing manual review (REVIEW and MISS).
    #[arg(long, default_value = "venue_coords_REVIEW.csv")]
    out_review: PathBuf,

    /// Optional reduced OK file: venue_id, lat, lon.
    #[arg(long)]
    out_ok_min: Option<PathBuf>,

    /// Seconds between Nominatim calls (overrides config).
    #[arg(long = "sleep", value_name = "SECONDS", value_parser = parse_sleep)]
    min_interval_ms: Option<u64>,

    /// Contact email sent with every request (overrides config).
    #[arg(long)]
    contact_email: Option<String>,

    /// Config file (default: ~/.venue-geocoder/config.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Label check: "locality" or "name-tokens".
    #[arg(long, value_parser = parse_validator)]
    validator: Option<ValidatorKind>,

    /// Do not fall back to the secondary provider.
    #[arg(long)]
    no_secondary: bool,

    /// Log level for stderr (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_validator(s: &str) -> Result<ValidatorKind, String> {
    match s.to_lowercase().replace('_', "-").as_str() {
        "locality" | "city" => Ok(ValidatorKind::Locality),
        "name-tokens" | "name" => Ok(ValidatorKind::NameTokens),
        _ => Err(format!("Unknown validator '{}'. Use 'locality' or 'name-tokens'.", s)),
    }
}

/// Seconds (fractional allowed) to whole milliseconds.
fn parse_sleep(s: &str) -> Result<u64, String> {
    let seconds: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid sleep '{}'. Use a number of seconds, e.g. 1.1.", s))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("Invalid sleep '{}'. Must be a non-negative number of seconds.", s));
    }
    Ok((seconds * 1000.0).round() as u64)
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<RunSummary, BatchError> {
    let mut config = GeocoderConfig::load(cli.config.as_deref())?;

    if let Some(ms) = cli.min_interval_ms {
        config.min_interval_ms = ms;
    }
    if let Some(email) = &cli.contact_email {
        config.contact_email = email.clone();
    }
    if let Some(kind) = cli.validator {
        config.validator = kind;
    }
    if cli.no_secondary {
        config.use_secondary = false;
    }
    config.validate()?;

    let resolver = VenueResolver::from_config(&config);
    let paths = BatchPaths {
        input: cli.input.clone(),
        out_ok: cli.out_ok.clone(),
        out_review: cli.out_review.clone(),
        out_ok_min: cli.out_ok_min.clone(),
    };
    batch::run(&resolver, &paths)
}
