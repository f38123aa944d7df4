//! Media server API clients
//!
//! - hosts: candidate hosts and the persisted last-good index
//! - fetch: single-flight cancellable GET with host failover
//! - catalog: home listing, paginated episodes, episode parts

pub mod catalog;
pub mod fetch;
pub mod hosts;

pub use catalog::{CatalogError, EpisodeCatalog, PageLoad};
pub use fetch::{FetchClient, FetchError, FetchErrorKind};
pub use hosts::{FileHostStore, HostRegistry, HostRegistryError, HostStore, MemoryHostStore};
