pub mod catalog;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod infra;
pub mod logging;
pub mod model;
pub mod normalizer;
pub mod server;

pub use catalog::{ActionCatalog, ActionCatalogEntry, CatalogEntryConfig};
pub use config::RouterConfig;
pub use dispatcher::{DispatcherHandle, IntentDispatcher, IntentDispatcherBuilder};
pub use error::{ConfigError, Rejection, Result, RouterError, UnrecognizedInputError};
pub use executor::{ActionExecutor, DashboardExecutor, ExecutionOutcome, ExecutorWorker};
pub use infra::{ChannelSwitches, CooldownScope, IntentRouter, RouteDecision, RouterStats};
pub use model::*;
pub use normalizer::IntentNormalizer;
pub use server::{IntentServer, RouteOutcome};
