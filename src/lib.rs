//! Parts catalog core
//!
//! Loads part records from an `images.json` document, checks that every
//! record's image actually loads, and serves the searchable, filterable set
//! of valid records to a view layer.

pub mod config;
pub mod error;
pub mod probe;
pub mod state;

pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use probe::{DecodingLoader, ImageLoader, ImageProbe, ProbeOutcome};
pub use state::data::Part;
pub use state::edit::PartFields;
pub use state::library::{Library, MergeSummary};
pub use state::session::{CatalogSession, CatalogView, DataSource, SessionState};
