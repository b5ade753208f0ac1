//! Storefront API GraphQL response shapes.
//!
//! Only the fields selected by [`crate::queries`] are modeled. Every field
//! other than `handle` defaults when absent so the lightweight specs query
//! can reuse [`StorefrontProduct`].
//!
//! ### Metafields
//! `metafields(identifiers: [...])` returns one entry per identifier, in
//! order, and `null` for identifiers the product does not carry. The list is
//! therefore modeled as `Vec<Option<Metafield>>`.

use carlot_core::{CarImage, Money};
use serde::Deserialize;

/// GraphQL envelope. Shopify may return `data` and `errors` together when
/// part of a query fails.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// `data` payload of queries selecting `products(...)`.
#[derive(Debug, Deserialize)]
pub struct ProductsData {
    pub products: ProductConnection,
}

/// `data` payload of `product(handle:)`.
#[derive(Debug, Deserialize)]
pub struct ProductByHandleData {
    pub product: Option<StorefrontProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConnection {
    pub edges: Vec<Edge<StorefrontProduct>>,
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
}

impl<T> Connection<T> {
    pub fn into_nodes(self) -> impl Iterator<Item = T> {
        self.edges.into_iter().map(|edge| edge.node)
    }
}

#[derive(Debug, Deserialize)]
pub struct Metafield {
    #[serde(default)]
    pub namespace: Option<String>,
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min_variant_price: Money,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontVariant {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_available")]
    pub available_for_sale: bool,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub metafields: Option<Vec<Option<Metafield>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontProduct {
    /// Global ID, e.g. `gid://shopify/Product/8123456789`.
    #[serde(default)]
    pub id: String,
    pub handle: String,
    #[serde(default)]
    pub title: String,
    /// Plain-text description. Empty when the product has none.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Defaults to `true` when not selected.
    #[serde(default = "default_available")]
    pub available_for_sale: bool,
    #[serde(default)]
    pub price_range: Option<PriceRange>,
    #[serde(default)]
    pub images: Option<Connection<CarImage>>,
    #[serde(default)]
    pub metafields: Option<Vec<Option<Metafield>>>,
    #[serde(default)]
    pub variants: Option<Connection<StorefrontVariant>>,
}

fn default_available() -> bool {
    true
}
