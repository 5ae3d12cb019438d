//! Venue address resolution.
//!
//! Turns a loosely structured venue record into coordinates through an
//! ordered cascade of query strategies against rate-limited providers, then
//! checks the first hit for plausibility and classifies the outcome.

pub mod classifier;
pub mod locality;
pub mod providers;
pub mod resolver;
pub mod strategy;
pub mod types;
pub mod validator;

pub use locality::{Locality, LocalityTable};
pub use providers::{Provider, SearchContext};
pub use resolver::VenueResolver;
pub use types::{
    Hit, ProviderError, ProviderErrorKind, Reason, ResolutionResult, Status, Strategy, StrategyTag, ValidatorKind,
    VenueInput,
};
