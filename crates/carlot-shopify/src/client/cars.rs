//! Car listing operations for `StorefrontClient`.

use std::collections::HashMap;

use carlot_core::{Car, CarSpecs};
use serde_json::json;

use crate::error::ShopifyError;
use crate::metafields::metafield_identifiers;
use crate::normalize::{normalize_car, product_specs};
use crate::queries::{
    handle_search_query, ALL_CARS, CAR_BY_HANDLE, HOMEPAGE_CARS, METAFIELD_NAMESPACE,
    SPECS_BY_HANDLES,
};
use crate::types::{ProductByHandleData, ProductsData, StorefrontProduct};

use super::{StorefrontClient, MAX_PAGES, MAX_PAGE_SIZE};

/// Handles per `CarSpecs` search query; keeps the search string short.
const SPECS_BATCH_SIZE: usize = 50;

impl StorefrontClient {
    /// Fetches every listed car, newest first, following `pageInfo` cursors.
    ///
    /// Products that fail normalization are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Propagates any error from the underlying GraphQL call. Returns
    /// [`ShopifyError::PaginationLimit`] after [`MAX_PAGES`] pages.
    pub async fn fetch_all_cars(&self, page_size: u32) -> Result<Vec<Car>, ShopifyError> {
        let first = page_size.clamp(1, MAX_PAGE_SIZE);
        let identifiers = metafield_identifiers(METAFIELD_NAMESPACE);
        let mut cars = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let data: ProductsData = self
                .execute(
                    "AllCars",
                    ALL_CARS,
                    json!({ "first": first, "after": cursor, "identifiers": identifiers }),
                )
                .await?;

            cars.extend(normalize_all(data.products.edges.into_iter().map(|e| e.node)));

            let page_info = data.products.page_info;
            match page_info.end_cursor {
                Some(next) if page_info.has_next_page => cursor = Some(next),
                _ => return Ok(cars),
            }
        }

        Err(ShopifyError::PaginationLimit {
            max_pages: MAX_PAGES,
        })
    }

    /// Fetches the `limit` most recently updated cars for the homepage.
    ///
    /// # Errors
    ///
    /// Propagates any error from the underlying GraphQL call.
    pub async fn fetch_homepage_cars(&self, limit: u32) -> Result<Vec<Car>, ShopifyError> {
        let first = limit.clamp(1, MAX_PAGE_SIZE);
        let data: ProductsData = self
            .execute(
                "HomepageCars",
                HOMEPAGE_CARS,
                json!({
                    "first": first,
                    "identifiers": metafield_identifiers(METAFIELD_NAMESPACE),
                }),
            )
            .await?;

        Ok(normalize_all(
            data.products.edges.into_iter().map(|e| e.node),
        ))
    }

    /// Fetches a single car by its Shopify handle.
    ///
    /// Returns `Ok(None)` when the handle is blank or no product matches.
    ///
    /// # Errors
    ///
    /// Propagates any error from the underlying GraphQL call or from
    /// normalizing the returned product.
    pub async fn fetch_car_by_handle(&self, handle: &str) -> Result<Option<Car>, ShopifyError> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Ok(None);
        }

        let data: ProductByHandleData = self
            .execute(
                "CarByHandle",
                CAR_BY_HANDLE,
                json!({
                    "handle": handle,
                    "identifiers": metafield_identifiers(METAFIELD_NAMESPACE),
                }),
            )
            .await?;

        data.product.map(normalize_car).transpose()
    }

    /// Fetches normalized specs for a batch of handles.
    ///
    /// Duplicate and blank handles are ignored; handles with no matching
    /// product are absent from the result. An empty batch returns an empty
    /// map without calling the API.
    ///
    /// # Errors
    ///
    /// Propagates any error from the underlying GraphQL calls.
    pub async fn fetch_specs_by_handles<S: AsRef<str>>(
        &self,
        handles: &[S],
    ) -> Result<HashMap<String, CarSpecs>, ShopifyError> {
        let mut unique: Vec<&str> = Vec::new();
        for handle in handles {
            let handle = handle.as_ref().trim();
            if !handle.is_empty() && !unique.contains(&handle) {
                unique.push(handle);
            }
        }

        let identifiers = metafield_identifiers(METAFIELD_NAMESPACE);
        let mut specs = HashMap::with_capacity(unique.len());

        for chunk in unique.chunks(SPECS_BATCH_SIZE) {
            let data: ProductsData = self
                .execute(
                    "CarSpecs",
                    SPECS_BY_HANDLES,
                    json!({
                        "first": chunk.len(),
                        "query": handle_search_query(chunk),
                        "identifiers": identifiers,
                    }),
                )
                .await?;

            for node in data.products.edges.into_iter().map(|e| e.node) {
                // Product search is fuzzy; keep exact handle matches only.
                if !chunk.contains(&node.handle.as_str()) {
                    continue;
                }
                let first_variant = node
                    .variants
                    .and_then(|variants| variants.into_nodes().next());
                let car_specs = product_specs(node.metafields.as_deref(), first_variant.as_ref());
                specs.insert(node.handle, car_specs);
            }
        }

        Ok(specs)
    }
}

fn normalize_all(products: impl Iterator<Item = StorefrontProduct>) -> Vec<Car> {
    products
        .filter_map(|product| match normalize_car(product) {
            Ok(car) => Some(car),
            Err(e) => {
                tracing::warn!(error = %e, "skipping product that failed normalization");
                None
            }
        })
        .collect()
}
