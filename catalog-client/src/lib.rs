//! Client side of the service catalog: a retrying request executor, decoding
//! of health endpoint entries, and typed catalog operations on top of both.

pub mod catalog;
pub mod endpoint;
pub mod error;
pub mod executor;

pub use catalog::CatalogClient;
pub use error::{CatalogError, CatalogResult};
pub use executor::{ClientConfig, Reply, RequestExecutor, BACKOFF};
