//! Case details and cause lists from the eCourts portal.
//!
//! A request goes through three stages: [`request`] fetches the page,
//! [`parse`] pulls the raw fields out of the markup and [`normalize`] turns
//! them into [`CaseRecord`]s and [`CauseListEntry`]s. [`Portal`] ties the
//! stages together and is what the CLI and the web server call. [`store`]
//! writes the results to disk.

pub mod cli;
pub mod config;
mod error;
pub mod fixtures;
pub mod logging;
mod macros;
pub mod model;
pub mod normalize;
pub mod parse;
pub mod process;
pub mod request;
pub mod store;
pub mod web;

pub use error::{Error, FetchError, ParseError, Result, WriteError};
pub use model::{CaseRecord, CaseStatus, CauseList, CauseListEntry, CourtDescriptor, CourtTier};
pub use process::{CallContext, Lookup, Portal};

pub const DEFAULT_BASE_URL: &str = "https://services.ecourts.gov.in/ecourtindia_v6/";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 8_000;
