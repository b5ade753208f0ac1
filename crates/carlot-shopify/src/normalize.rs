//! Normalization from Storefront product nodes to [`carlot_core::Car`].
//!
//! Spec extraction is delegated to [`crate::metafields`]; this module
//! handles the structural conversion.

use carlot_core::{Car, CarImage, CarSpecs, CarStatus};

use crate::error::ShopifyError;
use crate::metafields::{normalize_specs_layered, MetafieldMap};
use crate::types::{Metafield, StorefrontProduct, StorefrontVariant};

/// Normalizes a [`StorefrontProduct`] into a [`Car`].
///
/// The status is the one derived from the listing; status overrides are
/// applied by the caller.
///
/// # Errors
///
/// Returns [`ShopifyError::Normalization`] if the product has no handle.
pub fn normalize_car(product: StorefrontProduct) -> Result<Car, ShopifyError> {
    let handle = product.handle.trim().to_owned();
    if handle.is_empty() {
        return Err(ShopifyError::Normalization {
            product_id: product.id,
            reason: "product has no handle".into(),
        });
    }

    let first_variant = product
        .variants
        .and_then(|variants| variants.into_nodes().next());
    let specs = product_specs(product.metafields.as_deref(), first_variant.as_ref());

    // Fall back to the first variant price when priceRange was not selected.
    let price = product
        .price_range
        .map(|range| range.min_variant_price)
        .or_else(|| first_variant.and_then(|v| v.price));

    let images: Vec<CarImage> = product
        .images
        .map(|images| {
            images
                .into_nodes()
                .filter(|image| !image.url.trim().is_empty())
                .collect()
        })
        .unwrap_or_default();

    let status = CarStatus::from_listing(product.available_for_sale, &product.tags);

    Ok(Car {
        id: product.id,
        handle,
        title: product.title.trim().to_owned(),
        description: product.description.trim().to_owned(),
        vendor: product.vendor.filter(|v| !v.trim().is_empty()),
        tags: product.tags,
        price,
        images,
        specs,
        status,
    })
}

/// Extracts specs from product-level metafields, falling back to the first
/// variant's metafields for fields the product leaves empty.
pub(crate) fn product_specs(
    product_metafields: Option<&[Option<Metafield>]>,
    first_variant: Option<&StorefrontVariant>,
) -> CarSpecs {
    let product_map = MetafieldMap::from_metafields(product_metafields.unwrap_or(&[]));
    let variant_map = MetafieldMap::from_metafields(
        first_variant
            .and_then(|variant| variant.metafields.as_deref())
            .unwrap_or(&[]),
    );
    normalize_specs_layered(&product_map, &variant_map)
}
