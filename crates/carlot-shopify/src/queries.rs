//! GraphQL documents sent to the Storefront API.
//!
//! Every car query selects the same `CarFields` fragment. Metafields are
//! requested through the `$identifiers` variable, built from the alias
//! table by [`crate::metafields::metafield_identifiers`].

/// Metafield namespace the dealership stores car specs under.
pub const METAFIELD_NAMESPACE: &str = "custom";

macro_rules! car_fields_fragment {
    () => {
        r"
fragment CarFields on Product {
  id
  handle
  title
  description
  vendor
  tags
  availableForSale
  priceRange { minVariantPrice { amount currencyCode } }
  images(first: 20) { edges { node { url altText } } }
  metafields(identifiers: $identifiers) { namespace key value }
  variants(first: 1) {
    edges {
      node {
        id
        title
        availableForSale
        price { amount currencyCode }
        metafields(identifiers: $identifiers) { namespace key value }
      }
    }
  }
}
"
    };
}

pub const ALL_CARS: &str = concat!(
    r"
query AllCars($first: Int!, $after: String, $identifiers: [HasMetafieldsIdentifier!]!) {
  products(first: $first, after: $after, sortKey: CREATED_AT, reverse: true) {
    edges { node { ...CarFields } }
    pageInfo { hasNextPage endCursor }
  }
}
",
    car_fields_fragment!()
);

pub const HOMEPAGE_CARS: &str = concat!(
    r"
query HomepageCars($first: Int!, $identifiers: [HasMetafieldsIdentifier!]!) {
  products(first: $first, sortKey: UPDATED_AT, reverse: true) {
    edges { node { ...CarFields } }
    pageInfo { hasNextPage endCursor }
  }
}
",
    car_fields_fragment!()
);

pub const CAR_BY_HANDLE: &str = concat!(
    r"
query CarByHandle($handle: String!, $identifiers: [HasMetafieldsIdentifier!]!) {
  product(handle: $handle) { ...CarFields }
}
",
    car_fields_fragment!()
);

/// Lightweight query returning only metafields for a batch of handles.
pub const SPECS_BY_HANDLES: &str = r"
query CarSpecs($first: Int!, $query: String!, $identifiers: [HasMetafieldsIdentifier!]!) {
  products(first: $first, query: $query) {
    edges {
      node {
        handle
        metafields(identifiers: $identifiers) { namespace key value }
        variants(first: 1) {
          edges { node { metafields(identifiers: $identifiers) { namespace key value } } }
        }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}
";

/// Builds the product search string `handle:"a" OR handle:"b"`.
pub(crate) fn handle_search_query<S: AsRef<str>>(handles: &[S]) -> String {
    handles
        .iter()
        .map(|h| format!("handle:\"{}\"", h.as_ref().replace('\\', "\\\\").replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}
