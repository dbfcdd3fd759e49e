pub mod cache;
pub mod catalogue;
pub mod collector;
pub mod config;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod pool;
pub mod reconcile;
pub mod store;

pub use config::Settings;
pub use error::{CatalogueError, FetchError, StoreError, TaskError};
pub use model::{Collection, JournalRecord, RsciFilter, NO_DATA};
pub use pipeline::{Pipeline, RefreshOptions, RefreshReport};
