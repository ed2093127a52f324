// roomlock-api: mutual-TLS client for the roomlock device-unlock backend

pub mod catalog;
pub mod client;
pub mod error;
pub mod transport;
pub mod trust;

pub use catalog::{Building, Catalog, Device, Level};
pub use client::CatalogClient;
pub use error::Error;
pub use transport::{ClientIdentity, ServerTrust, TransportConfig};
