pub mod client;
pub mod error;
pub mod metafields;
pub mod normalize;
pub mod queries;
pub(crate) mod retry;
pub mod types;

pub use client::StorefrontClient;
pub use error::ShopifyError;
pub use metafields::{first_match, normalize_specs, normalize_specs_layered, MetafieldMap, SpecField};
pub use normalize::normalize_car;
