//! Browser-side cache policy for the storefront.
//!
//! [`CachePolicy`] decides how each request is treated (bypass, network-first
//! page, cache-first static asset, or passthrough). [`ServiceWorker`] drives
//! the install / activate / fetch lifecycle against pluggable
//! [`CacheStorage`] and [`Network`] backends so it can run outside a browser.

pub mod error;
pub mod policy;
pub mod storage;
pub mod worker;

pub use error::OfflineError;
pub use policy::{CachePolicy, RouteClass};
pub use storage::{CacheStorage, MemoryCacheStorage};
pub use worker::{
    FetchRequest, FetchResponse, Network, ServiceWorker, WorkerMessage, WorkerState,
};
